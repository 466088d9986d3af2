use granite::common::config::{PageId, DB_PAGE_SIZE, DIRECTORY_ARRAY_SIZE};
use granite::common::rid::RID;
use granite::storage::index::int_comparator::IntComparator;
use granite::storage::page::hash_table_bucket_page::{bucket_array_size, HashTableBucketPage};
use granite::storage::page::hash_table_directory_page::HashTableDirectoryPage;

type BucketPage<D> = HashTableBucketPage<D, i32, RID>;

#[test]
fn bucket_page_sample_test() {
    let mut data = [0u8; DB_PAGE_SIZE];
    let cmp = IntComparator::new();
    let mut bucket = BucketPage::view(&mut data[..]);
    bucket.init(10);

    // Insert a few (key, value) pairs.
    for i in 0..10 {
        assert!(bucket.insert(&i, &RID::new(i as PageId, i as u32), &cmp));
    }
    assert!(bucket.is_full());

    // Check for the inserted pairs.
    for i in 0..10 {
        let mut result = Vec::new();
        assert!(bucket.get_value(&i, &cmp, &mut result));
        assert_eq!(result, vec![RID::new(i as PageId, i as u32)]);
    }

    // Exact duplicates are rejected; same key with a new value is not.
    assert!(!bucket.insert(&5, &RID::new(5, 5), &cmp));

    // Remove every other pair.
    for i in 0..10 {
        if i % 2 == 0 {
            assert!(bucket.remove(&i, &RID::new(i as PageId, i as u32), &cmp));
        }
    }
    assert_eq!(bucket.num_readable(), 5);

    // The removed pairs are gone, the others remain.
    for i in 0..10 {
        let mut result = Vec::new();
        let found = bucket.get_value(&i, &cmp, &mut result);
        assert_eq!(found, i % 2 != 0);
        // Removing them again fails.
        if i % 2 == 0 {
            assert!(!bucket.remove(&i, &RID::new(i as PageId, i as u32), &cmp));
        }
    }
}

#[test]
fn bucket_page_tombstone_test() {
    let mut data = [0u8; DB_PAGE_SIZE];
    let cmp = IntComparator::new();
    let mut bucket = BucketPage::view(&mut data[..]);
    bucket.init(4);

    assert!(bucket.insert(&1, &RID::new(1, 0), &cmp));
    assert!(bucket.insert(&2, &RID::new(2, 0), &cmp));
    assert!(bucket.remove(&1, &RID::new(1, 0), &cmp));

    // The occupied bit survives removal as a tombstone, the readable bit
    // does not.
    assert!(bucket.is_occupied(0));
    assert!(!bucket.is_readable(0));

    // The freed slot is reused by the next insert.
    assert!(bucket.insert(&3, &RID::new(3, 0), &cmp));
    assert!(bucket.is_readable(0));
    assert_eq!(bucket.key_at(0), 3);
    assert!(!bucket.is_empty());
    assert_eq!(bucket.num_readable(), 2);
}

#[test]
fn bucket_page_non_unique_keys() {
    let mut data = [0u8; DB_PAGE_SIZE];
    let cmp = IntComparator::new();
    let mut bucket = BucketPage::view(&mut data[..]);
    bucket.init(8);

    for slot in 0..4 {
        assert!(bucket.insert(&7, &RID::new(0, slot), &cmp));
    }
    let mut result = Vec::new();
    assert!(bucket.get_value(&7, &cmp, &mut result));
    assert_eq!(result.len(), 4);

    assert!(bucket.remove(&7, &RID::new(0, 2), &cmp));
    result.clear();
    assert!(bucket.get_value(&7, &cmp, &mut result));
    assert_eq!(result.len(), 3);
    assert!(!result.contains(&RID::new(0, 2)));
}

#[test]
fn bucket_page_default_capacity_fits() {
    let max_size = bucket_array_size::<i32, RID>();
    let mut data = [0u8; DB_PAGE_SIZE];
    let cmp = IntComparator::new();
    let mut bucket = BucketPage::view(&mut data[..]);
    bucket.init(max_size as u16);

    for i in 0..max_size as i32 {
        assert!(bucket.insert(&i, &RID::new(0, i as u32), &cmp), "slot {i}");
    }
    assert!(bucket.is_full());
    assert!(!bucket.insert(&-1, &RID::new(0, 0), &cmp));
}

#[test]
fn directory_page_sample_test() {
    let mut data = [0u8; DB_PAGE_SIZE];
    let mut directory = HashTableDirectoryPage::view(&mut data[..]);
    directory.init();
    directory.set_bucket_page_id(0, 10);
    directory.set_local_depth(0, 1);
    directory.set_bucket_page_id(1, 11);
    directory.set_local_depth(1, 1);

    assert_eq!(directory.global_depth(), 1);
    assert_eq!(directory.global_depth_mask(), 0x1);
    assert_eq!(directory.size(), 2);
    assert_eq!(directory.bucket_page_id(0), 10);
    assert_eq!(directory.bucket_page_id(1), 11);
    assert!(!directory.can_shrink());
    directory.verify_integrity();
}

#[test]
fn directory_page_grow_and_masks() {
    let mut data = [0u8; DB_PAGE_SIZE];
    let mut directory = HashTableDirectoryPage::view(&mut data[..]);
    directory.init();
    directory.set_bucket_page_id(0, 10);
    directory.set_local_depth(0, 1);
    directory.set_bucket_page_id(1, 11);
    directory.set_local_depth(1, 1);

    // Double the directory, mirroring the lower half.
    directory.incr_global_depth();
    for idx in 2..4 {
        directory.set_bucket_page_id(idx, directory.bucket_page_id(idx - 2));
        directory.set_local_depth(idx, directory.local_depth(idx - 2));
    }
    assert_eq!(directory.size(), 4);
    assert_eq!(directory.global_depth_mask(), 0x3);
    directory.verify_integrity();

    // Split the bucket at slot 0: local depth 2, sibling at slot 2.
    directory.incr_local_depth(0);
    assert_eq!(directory.local_depth_mask(0), 0x3);
    assert_eq!(directory.split_image_index(0), 2);
    directory.set_local_depth(2, 2);
    directory.set_bucket_page_id(2, 12);
    directory.verify_integrity();

    // Local depths below the global depth everywhere let it shrink;
    // slot 0 and 2 are pinned at depth 2, so it cannot.
    assert!(!directory.can_shrink());
    directory.set_local_depth(0, 1);
    directory.set_local_depth(2, 1);
    directory.set_bucket_page_id(2, 10);
    assert!(directory.can_shrink());
    directory.decr_global_depth();
    assert_eq!(directory.size(), 2);
    directory.verify_integrity();
}

#[test]
#[should_panic]
fn directory_page_integrity_catches_depth_mismatch() {
    let mut data = [0u8; DB_PAGE_SIZE];
    let mut directory = HashTableDirectoryPage::view(&mut data[..]);
    directory.init();
    directory.set_bucket_page_id(0, 10);
    directory.set_local_depth(0, 1);
    // Both slots point at page 10, but with different local depths.
    directory.set_bucket_page_id(1, 10);
    directory.set_local_depth(1, 0);
    directory.verify_integrity();
}

#[test]
fn directory_capacity_constant_is_consistent() {
    assert_eq!(1usize << 8, DIRECTORY_ARRAY_SIZE);
}
