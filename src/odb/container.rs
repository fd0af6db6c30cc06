use std::fs;
use std::io::Cursor;
use std::path::Path;

use encoding_rs::Encoding;
use log::{debug, info, warn};

use super::codec::crypto::{KeyProvider, SectionCipher};
use super::codec::digest::{self, DigestBuilder};
use super::codec::xor;
use super::format::flash::FlashContent;
use super::format::header::{self, declared_len};
use super::format::offsets::OffsetTable;
use super::format::sections::SectionReader;
use super::format::strings;
use super::iter::ObjectIterator;
use super::objects::{KindTable, OdbObject};
use super::types::error::{OdbError, Result};
use super::types::models::{Advisory, ContainerHeader, DigestScope, HASH_BLOCK_SIZE};

/// Options controlling how a container is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Encoding label used by [`Container::string_table_entries`]. `None` means UTF-8.
    pub string_encoding: Option<String>,
    /// Recompute both MD5 digests and report mismatches as advisories.
    pub verify_digests: bool,
    /// Type id → kind mapping used by [`Container::object_at`].
    pub kinds: KindTable,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            string_encoding: None,
            verify_digests: true,
            kinds: KindTable::default(),
        }
    }
}

/// One fully decoded ODB container.
///
/// Built once from a complete file read and immutable afterwards. Objects
/// are decoded on demand by index and never cached; independent indexes
/// never affect each other.
#[derive(Debug, Clone)]
pub struct Container {
    header: ContainerHeader,
    meta_info: String,
    hash_block: [u8; HASH_BLOCK_SIZE],
    size_list: Vec<u8>,
    binary: Vec<u8>,
    strings: Vec<u8>,
    flash: Vec<u8>,
    offsets: OffsetTable,
    advisories: Vec<Advisory>,
    string_encoding: &'static Encoding,
    kinds: KindTable,
}

impl Container {
    /// Reads the file at `path` and decodes it with [`load_container`].
    pub fn open(
        path: impl AsRef<Path>,
        keys: &impl KeyProvider,
        options: LoadOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening ODB file: {}", path.display());
        let bytes = fs::read(path)?;
        load_container(&bytes, keys, options)
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// The ASCII text describing the parent file and generation parameters.
    pub fn meta_info(&self) -> &str {
        &self.meta_info
    }

    /// Stored header MD5 followed by stored body MD5.
    pub fn hash_block(&self) -> &[u8; HASH_BLOCK_SIZE] {
        &self.hash_block
    }

    /// Recoverable findings raised while loading.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn object_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Decodes the object at `index`.
    ///
    /// # Errors
    /// [`OdbError::ObjectIndexOutOfRange`] for a bad index, otherwise any
    /// stream error raised by that object alone.
    pub fn object_at(&self, index: usize) -> Result<OdbObject> {
        let offset = self
            .offsets
            .get(index)
            .ok_or(OdbError::ObjectIndexOutOfRange {
                index,
                count: self.offsets.len(),
            })?;
        self.kinds.decode_at(
            &self.binary,
            offset as usize,
            &self.strings,
            self.header.binary.attributes,
            self.header.format_tag,
        )
    }

    /// Iterates over every object in index order.
    pub fn iter_objects(&self) -> ObjectIterator<'_> {
        ObjectIterator::new(self)
    }

    /// String section records decoded with the configured encoding.
    pub fn string_table_entries(&self) -> Vec<String> {
        strings::decode_records(&self.strings, self.string_encoding)
    }

    /// Decrypted, decompressed string section.
    pub fn raw_string_section(&self) -> &[u8] {
        &self.strings
    }

    /// Decrypted, decompressed binary section holding the objects and embedded files.
    pub fn raw_binary_section(&self) -> &[u8] {
        &self.binary
    }

    /// Decrypted, decompressed size-list section.
    pub fn size_list_section(&self) -> &[u8] {
        &self.size_list
    }

    /// Unmasked flash payload (SMR-F); empty in most SMR-D files.
    pub fn flash_payload(&self) -> &[u8] {
        &self.flash
    }

    /// Parses the segment layout of the flash payload.
    pub fn flash_content(&self) -> Result<FlashContent> {
        FlashContent::parse(&self.flash)
    }
}

/// Decodes a complete container file.
///
/// # Process
/// 1. Validate size, magic and header size; parse the fixed header
/// 2. Read the meta info text
/// 3. Build the XOR mask and key the block cipher for the client id
/// 4. Unmask the hash block; digest the header region
/// 5. Reconstruct the size list, binary and string sections, digesting their
///    XOR-only bytes
/// 6. Unmask the flash payload
/// 7. Compare digests and check the cursor reached the end of the file
/// 8. Build the object offset table from the size list
///
/// Digest mismatches and trailing bytes are advisories, never errors.
pub fn load_container(
    bytes: &[u8],
    keys: &impl KeyProvider,
    options: LoadOptions,
) -> Result<Container> {
    info!("Decoding ODB container ({} bytes)", bytes.len());

    let mut cursor = Cursor::new(bytes);
    let header = header::parse(&mut cursor)?;
    let meta_info_len = declared_len(header.meta_info_size, "meta info size")?;
    // The hash block is keyed from its end, up to HASH_BLOCK_SIZE past the file.
    let mask = xor::xor_mask_prefix(
        declared_len(header.xor_mask_size, "XOR mask size")?,
        bytes.len() + HASH_BLOCK_SIZE,
    );

    let cipher = match keys.key_for(header.client_id) {
        Some(key) => Some(SectionCipher::new(header.client_id, key)?),
        None => {
            warn!(
                "No decryption key for client id {:#010x}; only empty sections can be read",
                header.client_id
            );
            None
        }
    };

    let mut reader = SectionReader::new(
        bytes,
        cursor.position() as usize,
        mask,
        cipher,
        header.client_id,
    );
    let meta_info = String::from_utf8_lossy(reader.read_plain(meta_info_len, "meta info")?)
        .into_owned();
    debug!("Meta info: {} bytes", meta_info.len());

    let header_digest = options
        .verify_digests
        .then(|| digest::md5(&bytes[..reader.position()]));
    let hash_block = reader.read_hash_block()?;

    let mut body_digest = options.verify_digests.then(DigestBuilder::new);
    let size_list = reader.read_section(header.size_list, "size list", body_digest.as_mut())?;
    let binary = reader.read_section(header.binary, "binary", body_digest.as_mut())?;
    let string_section = reader.read_section(header.strings, "strings", body_digest.as_mut())?;
    let flash = reader.read_flash(header.flash_size)?;

    let mut advisories = Vec::new();
    if let Some(computed) = header_digest {
        check_digest(&mut advisories, DigestScope::Header, &hash_block[..16], computed);
    }
    if let Some(builder) = body_digest {
        check_digest(&mut advisories, DigestScope::Body, &hash_block[16..], builder.finish());
    }

    if reader.position() != bytes.len() {
        let advisory = Advisory::TrailingData {
            cursor: reader.position(),
            file_len: bytes.len(),
        };
        warn!("{}", advisory);
        advisories.push(advisory);
    }

    let offsets = OffsetTable::build(
        &size_list,
        declared_len(header.object_count, "object count")?,
        header.size_list.attributes,
    )?;

    let string_encoding = options
        .string_encoding
        .as_deref()
        .map(strings::parse_encoding)
        .unwrap_or(encoding_rs::UTF_8);

    info!(
        "ODB container decoded: format tag {}, {} objects, {} binary bytes, {} advisories",
        header.format_tag,
        offsets.len(),
        binary.len(),
        advisories.len()
    );

    Ok(Container {
        header,
        meta_info,
        hash_block,
        size_list,
        binary,
        strings: string_section,
        flash,
        offsets,
        advisories,
        string_encoding,
        kinds: options.kinds,
    })
}

fn check_digest(
    advisories: &mut Vec<Advisory>,
    scope: DigestScope,
    stored: &[u8],
    computed: [u8; 16],
) {
    if stored == computed {
        debug!("{} MD5 verified", scope);
        return;
    }
    let mut stored_digest = [0u8; 16];
    stored_digest.copy_from_slice(stored);
    let advisory = Advisory::DigestMismatch {
        scope,
        stored: stored_digest,
        computed,
    };
    warn!("{}", advisory);
    advisories.push(advisory);
}
