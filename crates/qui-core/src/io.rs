//! ファイルI/Oユーティリティ（gzip対応）
//!
//! シミュレータ出力は `*.json` のほか、アーカイブ済みの `*.json.gz` もそのまま読めるようにする。

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const READER_BUF_CAP: usize = 64 * 1024; // 64 KiB

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// 読み込み用ストリームを開く（`-` は標準入力、`.gz` は透過的に展開）
pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    if is_stdio(p) {
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, io::stdin())));
    }
    let f = File::open(p)?;
    if is_gzip(p) {
        let dec = flate2::read::GzDecoder::new(f);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, f)))
}

/// 圧縮出力の finish / close エラーを呼び出し側へ返すための書き込みラッパー
///
/// 正規化済みドキュメントの上書きはここを通すので、`close()` を呼ばずに捨てると
/// gzip のフッタが書かれずファイルが壊れる。
#[must_use = "圧縮・I/Oエラーを拾うには .close() を呼ぶこと"]
pub enum Writer {
    Plain(BufWriter<File>),
    Stdout(io::Stdout),
    Gz(flate2::write::GzEncoder<File>),
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Plain(f) => f.write(buf),
            Writer::Stdout(s) => s.write(buf),
            Writer::Gz(e) => e.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => f.flush(),
            Writer::Stdout(s) => s.flush(),
            Writer::Gz(e) => e.flush(),
        }
    }
}

impl Writer {
    /// ストリームを確定させ、下層のファイル / 標準出力をフラッシュする
    pub fn close(self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => {
                let mut file = f.into_inner().map_err(|e| e.into_error())?;
                file.flush()
            }
            Writer::Stdout(mut s) => s.flush(),
            Writer::Gz(e) => {
                let mut f = e.finish()?;
                f.flush()
            }
        }
    }
}

/// 書き込み用ストリームを開く（既存ファイルは切り詰めて上書き）
pub fn open_writer<P: AsRef<Path>>(path: P) -> io::Result<Writer> {
    let p = path.as_ref();
    if is_stdio(p) {
        return Ok(Writer::Stdout(io::stdout()));
    }
    let f = File::create(p)?;
    if is_gzip(p) {
        let enc = flate2::write::GzEncoder::new(f, flate2::Compression::default());
        return Ok(Writer::Gz(enc));
    }
    Ok(Writer::Plain(BufWriter::new(f)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_gzip_roundtrip_through_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json.gz");

        let mut w = open_writer(&path).unwrap();
        w.write_all(b"[[1,2],[3]]").unwrap();
        w.close().unwrap();

        // 圧縮されていること
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);

        let mut s = String::new();
        open_reader(&path).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "[[1,2],[3]]");
    }

    #[test]
    fn test_plain_file_is_not_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut w = open_writer(&path).unwrap();
        w.write_all(b"{}").unwrap();
        w.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
