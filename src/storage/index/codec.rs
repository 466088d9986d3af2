use crate::common::rid::RID;

/// Fixed-width little-endian codec for the key and value types stored in
/// index pages. Page layouts are computed from `ENCODED_LEN`, so encoding
/// must always produce exactly that many bytes.
pub trait Storable: Sized {
    const ENCODED_LEN: usize;

    /// Writes the encoding into `out`, which is exactly `ENCODED_LEN` bytes.
    fn encode(&self, out: &mut [u8]);

    /// Reads a value back from `data`, which is at least `ENCODED_LEN` bytes.
    fn decode(data: &[u8]) -> Self;
}

macro_rules! storable_int {
    ($($ty:ty),*) => {
        $(
            impl Storable for $ty {
                const ENCODED_LEN: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out[..Self::ENCODED_LEN].copy_from_slice(&self.to_le_bytes());
                }

                fn decode(data: &[u8]) -> Self {
                    <$ty>::from_le_bytes(data[..Self::ENCODED_LEN].try_into().unwrap())
                }
            }
        )*
    };
}

storable_int!(i32, u32, i64, u64);

impl Storable for RID {
    const ENCODED_LEN: usize = RID::ENCODED_LEN;

    fn encode(&self, out: &mut [u8]) {
        out[..Self::ENCODED_LEN].copy_from_slice(&self.to_bytes_le());
    }

    fn decode(data: &[u8]) -> Self {
        RID::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_round_trip() {
        let mut buf = [0u8; 8];
        (-42i64).encode(&mut buf);
        assert_eq!(i64::decode(&buf), -42);
    }

    #[test]
    fn test_rid_round_trip() {
        let mut buf = [0u8; RID::ENCODED_LEN];
        let rid = RID::new(7, 3);
        rid.encode(&mut buf);
        assert_eq!(RID::decode(&buf), rid);
    }
}
