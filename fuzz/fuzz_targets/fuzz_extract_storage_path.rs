//! Fuzz target for turning stored URLs into object paths.
//!
//! Checks that:
//! 1. No input causes a panic
//! 2. A derived path is never empty
//! 3. A path is only derived when the bucket segment is present
//!
//! Run with: `cargo +nightly fuzz run fuzz_extract_storage_path`

#![no_main]

use arbitrary::Arbitrary;
use asset_gc::gc::{ReferenceSet, extract_storage_path};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct UrlInput {
    bucket: String,
    url: String,
    /// Prepend a well-formed public URL prefix
    public_prefix: bool,
}

fuzz_target!(|input: UrlInput| {
    let url = if input.public_prefix {
        format!(
            "https://p.example.co/storage/v1/object/public/{}/{}",
            input.bucket, input.url
        )
    } else {
        input.url.clone()
    };

    if let Some(path) = extract_storage_path(&url, &input.bucket) {
        assert!(!path.is_empty());
        assert!(!input.bucket.is_empty());
        assert!(url.contains(&format!("/{}/", input.bucket)));
    }

    let mut set = ReferenceSet::new();
    set.add_url(&url, &input.bucket);
    assert_eq!(set.len() + set.malformed(), 1);
});
