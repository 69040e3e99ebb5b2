use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    io::{Error as IoError, ErrorKind, Read},
    num::NonZeroUsize,
};

/// Position-tracking little-endian reader over a container's bytes.
///
/// Positions are relative to wherever the wrapped reader started, so a reader seeked
/// to an embedded container's offset reports positions relative to that container.
pub(crate) struct Reader<R: Read> {
    inner: R,
    position: usize,
}

impl<R: Read> Reader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            inner: reader,
            position: 0,
        }
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }

    // Buffered sources hand out short reads at their buffer boundary,
    // so a single `read` call is not enough to tell that data ran out.
    fn fill(&mut self, buf: &mut [u8]) -> ReadResult<()> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.position += n;
                }
                Err(e) => match e.kind() {
                    // this I/O error is non-fatal, so reading is retried
                    ErrorKind::Interrupted => {}
                    ErrorKind::UnexpectedEof => {
                        return Err(self.to_error(ReadErrorKind::Incomplete(Needed::Unknown)))
                    }
                    _ => return Err(self.to_error_with_source(ReadErrorKind::Failure, e)),
                },
            }
        }

        match NonZeroUsize::new(buf.len() - filled) {
            None => Ok(()),
            Some(missing) => Err(self.to_error(ReadErrorKind::Incomplete(Needed::Size(missing)))),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn take_const<const LEN: usize>(&mut self) -> ReadResult<[u8; LEN]> {
        let mut buf = [0; LEN];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn take(&mut self, len: usize) -> ReadResult<Vec<u8>> {
        let mut buf = vec![0; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn skip(&mut self, amount: usize) -> ReadResult<()> {
        let mut scratch = [0; 512];
        let mut remaining = amount;

        while remaining > 0 {
            let step = remaining.min(scratch.len());
            match self.fill(&mut scratch[..step]) {
                Ok(()) => remaining -= step,
                Err(mut e) => {
                    // report the shortfall against the whole skip, not just this step
                    if let ReadErrorKind::Incomplete(Needed::Size(missing)) = e.kind {
                        let total = missing.get() + remaining - step;
                        e.kind = ReadErrorKind::Incomplete(Needed::Size(
                            NonZeroUsize::new(total).unwrap_or(missing),
                        ));
                    }
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    pub(crate) fn advance_to(&mut self, position: usize) -> ReadResult<()> {
        match position.checked_sub(self.position) {
            Some(amount) => self.skip(amount),
            None => Err(self.to_error(ReadErrorKind::Behind { target: position })),
        }
    }

    pub(crate) fn u8(&mut self) -> ReadResult<u8> {
        let [byte] = self.take_const()?;
        Ok(byte)
    }

    pub(crate) fn le_u32(&mut self) -> ReadResult<u32> {
        self.take_const().map(u32::from_le_bytes)
    }

    pub(crate) fn le_u64(&mut self) -> ReadResult<u64> {
        self.take_const().map(u64::from_le_bytes)
    }
}

type ReadResult<T> = Result<T, ReadError>;

#[derive(Debug)]
pub(crate) struct ReadError {
    position: usize,
    kind: ReadErrorKind,
    source: Option<IoError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReadErrorKind {
    Failure,
    Incomplete(Needed),
    Behind { target: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Needed {
    Size(NonZeroUsize),
    Unknown,
}

impl<R: Read> Reader<R> {
    fn to_error(&self, kind: ReadErrorKind) -> ReadError {
        ReadError {
            position: self.position,
            kind,
            source: None,
        }
    }

    fn to_error_with_source(&self, kind: ReadErrorKind, source: IoError) -> ReadError {
        ReadError {
            position: self.position,
            kind,
            source: Some(source),
        }
    }
}

#[cfg(test)]
impl ReadError {
    fn is_kind(&self, kind: ReadErrorKind) -> bool {
        self.kind == kind
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ReadErrorKind::Failure => f.write_str("failed to read data due to I/O error"),
            ReadErrorKind::Incomplete(needed) => match needed {
                Needed::Size(size) => {
                    f.write_str(&format!("incomplete data: needed {size} more bytes to read"))
                }
                Needed::Unknown => f.write_str("incomplete data"),
            },
            ReadErrorKind::Behind { target } => {
                f.write_str(&format!("cannot seek backwards to byte position {target}"))
            }
        }?;

        f.write_str(&format!(" - byte position {}", self.position))
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(e) => Some(e),
            None => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Needed, ReadErrorKind, Reader};
    use std::{
        io::{BufReader, Error as IoError, ErrorKind, Read, Result as IoResult},
        num::NonZeroUsize,
    };

    fn missing(n: usize) -> ReadErrorKind {
        ReadErrorKind::Incomplete(Needed::Size(NonZeroUsize::new(n).unwrap()))
    }

    #[test]
    fn take_bytes() {
        let data = b"abc123";
        let mut reader = Reader::new(data.as_slice());

        assert_eq!(reader.take_const().unwrap(), [97]);
        assert_eq!(reader.take_const().unwrap(), [98, 99]);
        assert_eq!(reader.take(3).unwrap(), b"123");
        assert_eq!(reader.take_const().unwrap(), []);
        assert!(reader.take_const::<1>().is_err_and(|e| e.is_kind(missing(1))));
    }

    #[test]
    fn skip_bytes() {
        let data = [0u8; 1500];
        let mut reader = Reader::new(data.as_slice());

        assert!(reader.skip(1).is_ok());
        assert!(reader.skip(1200).is_ok());
        assert!(reader.skip(0).is_ok());
        assert_eq!(reader.position(), 1201);
        assert!(reader.skip(700).is_err_and(|e| e.is_kind(missing(401))));
    }

    #[test]
    fn advance_to_position() {
        let data = b"abc123";
        let mut reader = Reader::new(data.as_slice());

        assert!(reader.advance_to(0).is_ok());
        assert!(reader.advance_to(2).is_ok());
        assert_eq!(reader.position(), 2);
        assert!(reader
            .advance_to(1)
            .is_err_and(|e| e.is_kind(ReadErrorKind::Behind { target: 1 })));
        assert!(reader.advance_to(6).is_ok());
        assert!(reader.advance_to(10).is_err_and(|e| e.is_kind(missing(4))));
    }

    #[test]
    fn parse_multiple_number_types() {
        let data = b"\x11\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x22";
        let mut reader = Reader::new(data.as_slice());

        assert_eq!(reader.le_u32().unwrap(), 17);
        assert_eq!(reader.u8().unwrap(), 0);
        assert_eq!(reader.le_u64().unwrap(), 1);
        assert_eq!(reader.u8().unwrap(), 34);
    }

    #[test]
    fn handle_incomplete_data() {
        let data = b"\x00\x00";
        let mut reader = Reader::new(data.as_slice());

        assert!(reader.le_u32().is_err_and(|e| e.is_kind(missing(2))));
    }

    #[test]
    fn read_across_buffer_boundary() {
        let data: Vec<u8> = (0..16).collect();
        // a 3-byte buffer forces every u32 to straddle a refill
        let mut reader = Reader::new(BufReader::with_capacity(3, data.as_slice()));

        assert_eq!(reader.le_u32().unwrap(), 0x0302_0100);
        assert_eq!(reader.le_u32().unwrap(), 0x0706_0504);
        assert_eq!(reader.position(), 8);
    }

    struct InterruptReader(usize);

    impl Read for InterruptReader {
        fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
            if self.0 < 3 {
                self.0 += 1;
                Err(IoError::from(ErrorKind::Interrupted))
            } else {
                buf.fill(7);
                Ok(buf.len())
            }
        }
    }

    #[test]
    fn handle_interrupted_io() {
        let mut reader = Reader::new(InterruptReader(0));

        assert_eq!(reader.u8().unwrap(), 7);
    }

    struct EofReader;

    impl Read for EofReader {
        fn read(&mut self, _buf: &mut [u8]) -> IoResult<usize> {
            Err(IoError::from(ErrorKind::UnexpectedEof))
        }
    }

    #[test]
    fn handle_unexpected_eof() {
        let mut reader = Reader::new(EofReader);

        assert!(reader
            .u8()
            .is_err_and(|e| e.is_kind(ReadErrorKind::Incomplete(Needed::Unknown))));
    }

    struct UnsupportedReader;

    impl Read for UnsupportedReader {
        fn read(&mut self, _buf: &mut [u8]) -> IoResult<usize> {
            Err(IoError::from(ErrorKind::Unsupported))
        }
    }

    #[test]
    fn handle_misc_io_error() {
        let mut reader = Reader::new(UnsupportedReader);

        assert!(reader.u8().is_err_and(|e| e.is_kind(ReadErrorKind::Failure)));
    }
}
