//! Just enough of the Solidity ABI for the file registry contract:
//! call encoding for `string`/`uint256`/`address`/tuple/array arguments and
//! decoding of the `FileRecord` tuple it returns.

use sha3::{Digest, Keccak256};

use super::FileRecord;

const WORD: usize = 32;

pub const REGISTER_UPLOAD: &str = "registerUpload(string,string,string,uint256)";
pub const REGISTER_DOWNLOAD: &str = "registerDownload(string)";
pub const GET_FILE_BY_CID: &str = "getFileByCID(string)";
pub const GET_FILES_BATCH: &str = "getFilesBatch(uint256,uint256)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("return data truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("integer does not fit: {0}")]
    Overflow(String),
    #[error("invalid utf-8 in string field")]
    Utf8,
    #[error("invalid address: {0}")]
    Address(String),
    #[error("invalid hex data: {0}")]
    Hex(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address([u8; 20]),
    String(String),
    Tuple(Vec<Token>),
    Array(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::Uint(_) | Token::Address(_) => false,
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
        }
    }

    fn head_size(&self) -> usize {
        match self {
            Token::Tuple(items) if !self.is_dynamic() => items.iter().map(Token::head_size).sum(),
            _ => WORD,
        }
    }
}

pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    out
}

/// Encode a sequence of values with head/tail layout
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend(uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }

    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(value) => uint_word(*value).to_vec(),
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address);
            word.to_vec()
        }
        Token::String(value) => {
            let bytes = value.as_bytes();
            let mut out = uint_word(bytes.len() as u128).to_vec();
            out.extend_from_slice(bytes);
            out.resize(WORD + padded_len(bytes.len()), 0);
            out
        }
        Token::Tuple(items) => encode(items),
        Token::Array(items) => {
            let mut out = uint_word(items.len() as u128).to_vec();
            out.extend(encode(items));
            out
        }
    }
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

pub fn parse_address(value: &str) -> Result<[u8; 20], AbiError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(digits).map_err(|_| AbiError::Address(value.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| AbiError::Address(value.to_string()))
}

pub fn decode_hex(value: &str) -> Result<Vec<u8>, AbiError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| AbiError::Hex(e.to_string()))
}

fn shift(base: usize, offset: usize) -> Result<usize, AbiError> {
    base.checked_add(offset)
        .ok_or(AbiError::Overflow(format!("offset {} + {}", base, offset)))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow(format!("offset {}", offset)))?;
    data.get(offset..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })
}

fn read_u128(data: &[u8], offset: usize) -> Result<u128, AbiError> {
    let word = word_at(data, offset)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(format!("0x{}", hex::encode(word))));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64, AbiError> {
    let value = read_u128(data, offset)?;
    u64::try_from(value).map_err(|_| AbiError::Overflow(value.to_string()))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = read_u128(data, offset)?;
    usize::try_from(value).map_err(|_| AbiError::Overflow(value.to_string()))
}

fn read_address(data: &[u8], offset: usize) -> Result<String, AbiError> {
    let word = word_at(data, offset)?;
    Ok(format!("0x{}", hex::encode(&word[12..])))
}

/// Read a string whose head word sits at `head`, with its offset relative to `base`
fn read_string(data: &[u8], base: usize, head: usize) -> Result<String, AbiError> {
    let start = base
        .checked_add(read_usize(data, head)?)
        .ok_or(AbiError::Overflow("string offset".into()))?;
    let len = read_usize(data, start)?;
    let body = shift(start, WORD)?;
    let end = body
        .checked_add(len)
        .ok_or(AbiError::Overflow("string length".into()))?;
    let bytes = data.get(body..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::Utf8)
}

/// Layout: `(string cid, string name, string fileType, uint256 size,
///  address uploader, uint256 timestamp, uint256 downloadCount)`
fn read_record(data: &[u8], base: usize) -> Result<FileRecord, AbiError> {
    Ok(FileRecord {
        cid: read_string(data, base, base)?,
        name: read_string(data, base, shift(base, WORD)?)?,
        file_type: read_string(data, base, shift(base, 2 * WORD)?)?,
        size: read_u64(data, shift(base, 3 * WORD)?)?,
        uploader: read_address(data, shift(base, 4 * WORD)?)?,
        timestamp: read_u64(data, shift(base, 5 * WORD)?)?,
        download_count: read_u64(data, shift(base, 6 * WORD)?)?,
    })
}

/// Decode the return data of `getFileByCID`
pub fn decode_record(data: &[u8]) -> Result<FileRecord, AbiError> {
    let base = read_usize(data, 0)?;
    read_record(data, base)
}

/// Decode the return data of `getFilesBatch`
pub fn decode_records(data: &[u8]) -> Result<Vec<FileRecord>, AbiError> {
    let array = read_usize(data, 0)?;
    let count = read_usize(data, array)?;
    let items = shift(array, WORD)?;

    (0..count)
        .map(|i| {
            let head = shift(items, i.saturating_mul(WORD))?;
            let element = shift(items, read_usize(data, head)?)?;
            read_record(data, element)
        })
        .collect()
}

impl FileRecord {
    /// Tuple encoding of a record, as the contract would return it
    pub fn to_token(&self) -> Result<Token, AbiError> {
        Ok(Token::Tuple(vec![
            Token::String(self.cid.clone()),
            Token::String(self.name.clone()),
            Token::String(self.file_type.clone()),
            Token::Uint(self.size as u128),
            Token::Address(parse_address(&self.uploader)?),
            Token::Uint(self.timestamp as u128),
            Token::Uint(self.download_count as u128),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cid: &str, name: &str) -> FileRecord {
        FileRecord {
            cid: cid.to_string(),
            name: name.to_string(),
            file_type: "text/plain".to_string(),
            size: 2048,
            uploader: "0x00000000000000000000000000000000000000ab".to_string(),
            timestamp: 1_700_000_000,
            download_count: 3,
        }
    }

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn test_encode_single_string_argument() {
        let encoded = encode(&[Token::String("abc".into())]);
        assert_eq!(encoded.len(), 3 * WORD);
        // offset to the string body
        assert_eq!(read_usize(&encoded, 0).unwrap(), 32);
        assert_eq!(read_usize(&encoded, 32).unwrap(), 3);
        assert_eq!(&encoded[64..67], b"abc");
        assert!(encoded[67..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_mixed_head_and_tail() {
        let encoded = encode(&[
            Token::String("a".into()),
            Token::String("bb".into()),
            Token::String("".into()),
            Token::Uint(2048),
        ]);
        // four head words then the string bodies
        assert_eq!(read_usize(&encoded, 0).unwrap(), 128);
        assert_eq!(read_usize(&encoded, 32).unwrap(), 192);
        assert_eq!(read_usize(&encoded, 64).unwrap(), 256);
        assert_eq!(read_u64(&encoded, 96).unwrap(), 2048);
        assert_eq!(read_string(&encoded, 0, 32).unwrap(), "bb");
        assert_eq!(read_string(&encoded, 0, 64).unwrap(), "");
        assert_eq!(encoded.len(), 128 + 64 + 64 + 32);
    }

    #[test]
    fn test_encode_call_prefixes_selector() {
        let call = encode_call(REGISTER_DOWNLOAD, &[Token::String("bafy".into())]);
        assert_eq!(&call[..4], &selector(REGISTER_DOWNLOAD));
        assert_eq!(call.len(), 4 + 3 * WORD);
    }

    #[test]
    fn test_decode_record_return_data() {
        let expected = record("bafybeigdyrzt", "demo.txt");
        let data = encode(&[expected.to_token().unwrap()]);
        assert_eq!(decode_record(&data).unwrap(), expected);
    }

    #[test]
    fn test_decode_records_return_data() {
        let expected = vec![record("cid-1", "CD-ROM 1998"), record("cid-2", "Álbum Retro")];
        let tokens = expected.iter().map(|r| r.to_token().unwrap()).collect();
        let data = encode(&[Token::Array(tokens)]);
        assert_eq!(decode_records(&data).unwrap(), expected);

        let empty = encode(&[Token::Array(vec![])]);
        assert!(decode_records(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated_data() {
        let data = encode(&[record("cid", "x").to_token().unwrap()]);
        let err = decode_record(&data[..100]).unwrap_err();
        assert!(matches!(err, AbiError::Truncated { .. }));
    }

    #[test]
    fn test_decode_records_hostile_element_offset() {
        let mut data = Vec::new();
        data.extend(encode(&[Token::Uint(32), Token::Uint(1)]));
        data.extend([0xff; WORD]);
        let err = decode_records(&data).unwrap_err();
        assert!(matches!(err, AbiError::Overflow(_) | AbiError::Truncated { .. }));

        // a word that fits usize but lands past the end
        let mut data = encode(&[Token::Uint(32), Token::Uint(1)]);
        data.extend(encode(&[Token::Uint(u64::MAX as u128)]));
        let err = decode_records(&data).unwrap_err();
        assert!(matches!(err, AbiError::Overflow(_) | AbiError::Truncated { .. }));
    }

    #[test]
    fn test_parse_address() {
        let address = parse_address("0x55191Fa9c937E97759F1cef854F331F84040406e").unwrap();
        assert_eq!(address[0], 0x55);
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not hex").is_err());
    }
}
