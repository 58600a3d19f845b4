use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

/// Gzip magic bytes plus the deflate method byte
const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
/// Local file header of a ZIP archive
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

const ZIP_UNSUPPORTED: &str = "ZIP archives are not supported, only gzip and zstd";

/// Compression formats recognised on input files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Zip,
    Plain,
}

impl Compression {
    /// Detect the format from the first bytes of a stream
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else if head.starts_with(&ZIP_MAGIC) {
            Compression::Zip
        } else {
            Compression::Plain
        }
    }
}

/// Open an input file, transparently decompressing gzip and zstd content
pub fn open_input<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    maybe_decompress(file).map_err(|e| {
        if e.kind() == io::ErrorKind::Unsupported {
            io::Error::new(
                e.kind(),
                format!("{}. Extract it first: unzip {}", e, path.display()),
            )
        } else {
            e
        }
    })
}

/// Wrap any reader, sniffing magic bytes to pick a decoder
pub fn maybe_decompress<R: Read + Send + 'static>(mut reader: R) -> io::Result<Box<dyn Read + Send>> {
    let mut head = [0u8; 4];
    let n = read_head(&mut reader, &mut head)?;

    // Put the sniffed bytes back in front of the stream
    let chained = Cursor::new(head[..n].to_vec()).chain(reader);

    Ok(match Compression::detect(&head[..n]) {
        Compression::Gzip => Box::new(MultiGzDecoder::new(chained)),
        Compression::Zstd => Box::new(zstd::Decoder::new(chained)?),
        Compression::Zip => {
            return Err(io::Error::new(io::ErrorKind::Unsupported, ZIP_UNSUPPORTED));
        }
        Compression::Plain => Box::new(chained),
    })
}

/// Fill `head` as far as the stream allows; short reads only stop at EOF
fn read_head<R: Read>(reader: &mut R, head: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
