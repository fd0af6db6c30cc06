mod common;

use std::fs;

use common::{
    COMPACT_FLAGS, COMPRESSED, CLIENT_ID, ContainerBuilder, FORMAT_TAG, Section, StreamWriter,
    flash_payload, keys,
};
use odb_reader::odb::codec::digest::md5;
use odb_reader::odb::objects::{EXTERNAL_FILE_TYPE_ID, VDX_FLASH_TYPE_ID};
use odb_reader::{
    Advisory, Container, DigestScope, KeyTable, LoadOptions, ObjectBody, ObjectKind, OdbError,
    load_container,
};

fn write_vdx_flash(w: &mut StreamWriter, name: &str) {
    w.i32(VDX_FLASH_TYPE_ID)
        .named(1, name)
        .string("category")
        .i32(-3)
        .u32(4)
        .array(&[1, 2])
        .array(&[])
        .string("flash")
        .array(&[10])
        .array(&[20, 30])
        .array(&[40]);
}

fn write_external_file(w: &mut StreamWriter) {
    w.i32(EXTERNAL_FILE_TYPE_ID)
        .base(2)
        .string("lib.so")
        .u32(4096)
        .u32(0)
        .i32(2);
}

/// A compact VdxFlash followed by an ExternalFile.
fn sample_builder() -> ContainerBuilder {
    let mut w = StreamWriter::with_pool(COMPACT_FLAGS);
    write_vdx_flash(&mut w, "ECU_A");
    let first = w.take();
    write_external_file(&mut w);
    let second = w.take();
    ContainerBuilder::default().with_objects(COMPACT_FLAGS, &[first, second], w.pool())
}

fn patch_i32(file: &mut [u8], offset: usize, value: i32) {
    file[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_i32(file: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(file[offset..offset + 4].try_into().expect("4 bytes"))
}

#[test]
fn minimal_container_is_0x78_bytes() {
    let builder = ContainerBuilder {
        meta_info: Vec::new(),
        ..ContainerBuilder::default()
    };
    let file = builder.build();
    assert_eq!(file.len(), 0x78);

    let container = load_container(&file, &KeyTable::new(), LoadOptions::default())
        .expect("minimal container");
    assert_eq!(container.object_count(), 0);
    assert_eq!(container.meta_info(), "");
    assert!(container.advisories().is_empty(), "{:?}", container.advisories());
    assert_eq!(&container.hash_block()[..16], &md5(&file[..0x58]));
    assert!(container.raw_binary_section().is_empty());
    assert!(container.string_table_entries().is_empty());
    assert!(container.iter_objects().next().is_none());
}

#[test]
fn empty_container_tolerates_digest_mismatch() {
    let builder = ContainerBuilder {
        format_tag: 0x10705,
        xor_mask_size: 4,
        meta_info: Vec::new(),
        corrupt_body_digest: true,
        ..ContainerBuilder::default()
    };
    let container = load_container(&builder.build(), &KeyTable::new(), LoadOptions::default())
        .expect("empty container");

    assert_eq!(container.object_count(), 0);
    assert_eq!(container.header().format_tag.0, 0x10705);
    for advisory in container.advisories() {
        assert!(
            matches!(
                advisory,
                Advisory::DigestMismatch {
                    scope: DigestScope::Body,
                    ..
                } | Advisory::TrailingData { .. }
            ),
            "unexpected advisory {}",
            advisory
        );
    }
    assert_eq!(container.advisories().len(), 1);
}

#[test]
fn short_files_are_rejected_before_magic() {
    let file = ContainerBuilder::default().build();
    match load_container(&file[..0x77], &keys(), LoadOptions::default()) {
        Err(OdbError::InvalidSize { minimum, found }) => {
            assert_eq!(minimum, 0x78);
            assert_eq!(found, 0x77);
        }
        other => panic!("expected InvalidSize, got {:?}", other),
    }

    let garbage = [0xABu8; 16];
    assert!(matches!(
        load_container(&garbage, &keys(), LoadOptions::default()),
        Err(OdbError::InvalidSize { .. })
    ));
}

#[test]
fn wrong_magic_is_rejected() {
    let mut file = ContainerBuilder::default().build();
    file[3] ^= 0x01;
    let err = load_container(&file, &keys(), LoadOptions::default()).unwrap_err();
    assert!(matches!(err, OdbError::IncompatibleMagic(_)), "got {}", err);
}

#[test]
fn wrong_header_size_is_rejected() {
    let builder = ContainerBuilder {
        header_size: 0x48,
        ..ContainerBuilder::default()
    };
    let err = load_container(&builder.build(), &keys(), LoadOptions::default()).unwrap_err();
    assert!(
        matches!(
            err,
            OdbError::IncompatibleHeaderSize {
                expected: 0x44,
                found: 0x48
            }
        ),
        "got {}",
        err
    );
}

#[test]
fn header_fields_are_exposed() {
    let file = sample_builder().build();
    let container = load_container(&file, &keys(), LoadOptions::default()).expect("container");
    let header = container.header();

    assert_eq!(header.format_tag.0, FORMAT_TAG);
    assert_eq!(header.client_id, CLIENT_ID);
    assert_eq!(header.object_count, 2);
    assert_eq!(header.binary.attributes.0, COMPACT_FLAGS | COMPRESSED);
    assert!(header.binary.attributes.compressed());
    assert_eq!(header.uninitialized, [0xEE; 8]);
    assert_eq!(container.meta_info(), "parent=fixture.odx;gen=1");
}

#[test]
fn encrypted_compressed_container_decodes_objects() {
    let builder = sample_builder();
    let file = builder.build();
    let container = load_container(&file, &keys(), LoadOptions::default()).expect("container");

    assert!(container.advisories().is_empty(), "{:?}", container.advisories());
    assert_eq!(container.object_count(), 2);
    assert_eq!(container.raw_binary_section(), builder.binary.plain.as_slice());
    assert_eq!(container.raw_string_section(), builder.strings.plain.as_slice());
    assert_eq!(container.size_list_section(), builder.size_list.plain.as_slice());
    assert_eq!(container.offsets().end(), builder.binary.plain.len() as u64);

    let first = container.object_at(0).expect("object 0");
    assert_eq!(first.kind(), Some(ObjectKind::VdxFlash));
    assert_eq!(first.offset, 0);
    assert_eq!(first.base().base_value, 1);
    match &first.body {
        ObjectBody::VdxFlash(flash) => {
            assert_eq!(flash.category.named.name, "ECU_A");
            assert_eq!(flash.category.named.long_name, None);
            assert_eq!(flash.category.category_name, "category");
            assert_eq!(flash.category.signed_value, Some(-3));
            assert_eq!(flash.category.members, vec![1, 2]);
            assert_eq!(flash.flash_name, "flash");
            assert_eq!(flash.second, vec![20, 30]);
            assert_eq!(flash.trailing, Some(vec![40]));
        }
        other => panic!("expected VdxFlash, got {:?}", other),
    }

    let second = container.object_at(1).expect("object 1");
    match &second.body {
        ObjectBody::ExternalFile(file) => {
            assert_eq!(file.file_name.as_deref(), Some("lib.so"));
            assert_eq!(file.file_size, Some(4096));
            assert_eq!(file.object_index, Some(0));
            assert_eq!(file.file_type, Some(2));
        }
        other => panic!("expected ExternalFile, got {:?}", other),
    }

    match container.object_at(2) {
        Err(OdbError::ObjectIndexOutOfRange { index, count }) => {
            assert_eq!((index, count), (2, 2));
        }
        other => panic!("expected index error, got {:?}", other),
    }

    let entries = container.string_table_entries();
    assert_eq!(entries, vec!["ECU_A", "category", "flash", "lib.so"]);
}

#[test]
fn objects_decode_independently() {
    let file = sample_builder().build();
    let container = load_container(&file, &keys(), LoadOptions::default()).expect("container");

    let later = container.object_at(1).expect("object 1");
    let first = container.object_at(0).expect("object 0");
    assert_eq!(container.object_at(1).expect("object 1 again"), later);
    assert_eq!(container.object_at(0).expect("object 0 again"), first);

    let all: Vec<_> = container.iter_objects().collect();
    assert_eq!(all.len(), 2);
    assert_eq!(container.iter_objects().len(), 2);
    for (index, result) in all {
        let object = result.unwrap_or_else(|e| panic!("object {} failed: {}", index, e));
        assert_eq!(object.offset as u64, container.offsets().as_slice()[index]);
    }
}

#[test]
fn a_broken_object_does_not_affect_its_neighbours() {
    let mut w = StreamWriter::with_pool(COMPACT_FLAGS);
    write_external_file(&mut w);
    let good = w.take();
    write_vdx_flash(&mut w, "TRUNCATED");
    let mut broken = w.take();
    broken.truncate(broken.len() - 2);
    let builder =
        ContainerBuilder::default().with_objects(COMPACT_FLAGS, &[good, broken], w.pool());

    let container =
        load_container(&builder.build(), &keys(), LoadOptions::default()).expect("container");
    let results: Vec<_> = container.iter_objects().collect();
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(OdbError::UnexpectedEndOfData { .. })
    ));
    assert!(container.object_at(0).is_ok());
}

#[test]
fn digest_mismatches_are_advisories() {
    let builder = ContainerBuilder {
        corrupt_header_digest: true,
        corrupt_body_digest: true,
        ..sample_builder()
    };
    let container =
        load_container(&builder.build(), &keys(), LoadOptions::default()).expect("container");

    let scopes: Vec<DigestScope> = container
        .advisories()
        .iter()
        .filter_map(|a| match a {
            Advisory::DigestMismatch { scope, .. } => Some(*scope),
            _ => None,
        })
        .collect();
    assert_eq!(scopes, vec![DigestScope::Header, DigestScope::Body]);
    assert_eq!(container.object_count(), 2);
    assert!(container.object_at(0).is_ok());

    let quiet = LoadOptions {
        verify_digests: false,
        ..LoadOptions::default()
    };
    let container = load_container(&builder.build(), &keys(), quiet).expect("container");
    assert!(container.advisories().is_empty());
}

#[test]
fn trailing_bytes_are_an_advisory() {
    let builder = ContainerBuilder {
        trailing: b"xyz".to_vec(),
        ..sample_builder()
    };
    let file = builder.build();
    let container = load_container(&file, &keys(), LoadOptions::default()).expect("container");
    assert_eq!(
        container.advisories(),
        &[Advisory::TrailingData {
            cursor: file.len() - 3,
            file_len: file.len()
        }]
    );
}

#[test]
fn missing_key_fails_only_for_encrypted_sections() {
    let file = sample_builder().build();
    let err = load_container(&file, &KeyTable::new(), LoadOptions::default()).unwrap_err();
    assert!(matches!(err, OdbError::MissingClientKey(id) if id == CLIENT_ID));

    let other_client = KeyTable::new().with_key(CLIENT_ID + 1, b"another-key".to_vec());
    assert!(matches!(
        load_container(&file, &other_client, LoadOptions::default()),
        Err(OdbError::MissingClientKey(_))
    ));
}

#[test]
fn unusable_key_is_rejected() {
    let file = sample_builder().build();
    let short = KeyTable::new().with_key(CLIENT_ID, b"abc".to_vec());
    assert!(matches!(
        load_container(&file, &short, LoadOptions::default()),
        Err(OdbError::InvalidKey { len: 3, .. })
    ));
}

#[test]
fn unaligned_encrypted_section_is_rejected() {
    let mut file = sample_builder().build();
    let stored = read_i32(&file, 0x38);
    patch_i32(&mut file, 0x38, stored - 4);
    let err = load_container(&file, &keys(), LoadOptions::default()).unwrap_err();
    assert!(
        matches!(err, OdbError::SizeMismatch { block_size: 8, .. }),
        "got {}",
        err
    );
}

#[test]
fn negative_section_size_is_rejected() {
    let mut file = sample_builder().build();
    patch_i32(&mut file, 0x30, -8);
    assert!(matches!(
        load_container(&file, &keys(), LoadOptions::default()),
        Err(OdbError::InvalidFormat(_))
    ));
}

#[test]
fn sections_past_end_of_file_are_rejected() {
    let mut file = sample_builder().build();
    let stored = read_i32(&file, 0x40);
    patch_i32(&mut file, 0x40, stored + 8);
    assert!(matches!(
        load_container(&file, &keys(), LoadOptions::default()),
        Err(OdbError::UnexpectedEndOfData { .. })
    ));
}

#[test]
fn uncompressed_sections_and_empty_mask() {
    let mut w = StreamWriter::with_pool(0);
    w.i32(EXTERNAL_FILE_TYPE_ID).base(5).string("a.bin").u32(1).u32(2).i32(3);
    let object = w.take();
    let mut sizes = StreamWriter::new(0);
    sizes.u32(object.len() as u32);

    let builder = ContainerBuilder {
        xor_mask_size: 0,
        object_count: 1,
        size_list: Section::new(sizes.bytes(), 0),
        binary: Section::new(object, 0),
        strings: Section::new(b"a.bin\0\0\0".to_vec(), 0),
        ..ContainerBuilder::default()
    };
    let container =
        load_container(&builder.build(), &keys(), LoadOptions::default()).expect("container");
    assert!(container.advisories().is_empty(), "{:?}", container.advisories());
    assert_eq!(container.string_table_entries(), vec!["a.bin", "", ""]);

    let object = container.object_at(0).expect("object");
    assert_eq!(object.base().base_value, 5);
    match object.body {
        ObjectBody::ExternalFile(file) => assert_eq!(file.file_name.as_deref(), Some("a.bin")),
        other => panic!("expected ExternalFile, got {:?}", other),
    }
}

#[test]
fn oversized_mask_declaration_is_bounded_by_file_length() {
    let builder = ContainerBuilder {
        meta_info: Vec::new(),
        xor_mask_size: 0x7FFF_FFFF,
        ..ContainerBuilder::default()
    };
    let file = builder.build();
    assert_eq!(file.len(), 0x78);
    assert_eq!(read_i32(&file, 0x20), 0x7FFF_FFFF);

    let container =
        load_container(&file, &KeyTable::new(), LoadOptions::default()).expect("minimal container");
    assert!(container.advisories().is_empty(), "{:?}", container.advisories());
    assert_eq!(&container.hash_block()[..16], &md5(&file[..0x58]));

    let builder = ContainerBuilder {
        xor_mask_size: 0x7FFF_FFFF,
        ..sample_builder()
    };
    let container =
        load_container(&builder.build(), &keys(), LoadOptions::default()).expect("container");
    assert!(container.advisories().is_empty(), "{:?}", container.advisories());
    assert_eq!(container.object_at(0).expect("object 0").kind(), Some(ObjectKind::VdxFlash));
}

#[test]
fn flash_payload_is_unmasked() {
    let payload = flash_payload(1, &[(0x0000_4000, &b"\x01\x02\x03"[..])]);
    let builder = ContainerBuilder {
        flash: payload.clone(),
        ..sample_builder()
    };
    let container =
        load_container(&builder.build(), &keys(), LoadOptions::default()).expect("container");
    assert!(container.advisories().is_empty());
    assert_eq!(container.flash_payload(), payload.as_slice());

    let content = container.flash_content().expect("flash content");
    assert_eq!(content.segments.len(), 1);
    assert_eq!(content.segments[0].address, 0x4000);
    assert_eq!(content.segments[0].content, vec![1, 2, 3]);
}

#[test]
fn string_table_entries_use_configured_encoding() {
    let builder = ContainerBuilder {
        strings: Section::new(b"Gr\xF6\xDFe\0ok\0".to_vec(), COMPRESSED),
        ..ContainerBuilder::default()
    };
    let options = LoadOptions {
        string_encoding: Some("windows-1252".to_string()),
        ..LoadOptions::default()
    };
    let container = load_container(&builder.build(), &keys(), options).expect("container");
    assert_eq!(container.string_table_entries(), vec!["Größe", "ok"]);
}

#[test]
fn open_reads_from_disk() {
    let path = std::env::temp_dir().join(format!("odb-reader-{}.smr-d", std::process::id()));
    fs::write(&path, sample_builder().build()).expect("write fixture");

    let result = Container::open(&path, &keys(), LoadOptions::default());
    fs::remove_file(&path).expect("remove fixture");

    let container = result.expect("open");
    assert_eq!(container.object_count(), 2);

    assert!(matches!(
        Container::open(&path, &keys(), LoadOptions::default()),
        Err(OdbError::Io(_))
    ));
}
