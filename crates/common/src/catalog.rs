//! Read-side helpers over the uploaded files view.

use crate::store::FileMetadata;

/// Files whose name contains `query`, ignoring case; an empty query matches all
pub fn search<'a>(files: &'a [FileMetadata], query: &str) -> Vec<&'a FileMetadata> {
    let needle = query.trim().to_lowercase();
    files
        .iter()
        .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
        .collect()
}

/// Files stored by `address`, compared case-insensitively
pub fn owned_by<'a>(files: &'a [FileMetadata], address: &str) -> Vec<&'a FileMetadata> {
    let address = address.trim();
    files
        .iter()
        .filter(|f| !address.is_empty() && f.owner.trim().eq_ignore_ascii_case(address))
        .collect()
}

pub fn find_by_cid<'a>(files: &'a [FileMetadata], cid: &str) -> Option<&'a FileMetadata> {
    files.iter().find(|f| f.cid == cid)
}

/// Size in kilobytes with two decimals
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// `0x1234...abcd` form of an account address
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, owner: &str, cid: &str) -> FileMetadata {
        FileMetadata {
            name: name.to_string(),
            mime_type: "application/octet-stream".to_string(),
            size: 1,
            upload_date: "2024-05-01T10:00:00.000Z".to_string(),
            owner: owner.to_string(),
            cid: cid.to_string(),
        }
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let files = vec![
            file("CD-ROM 1998", "0xa", "c1"),
            file("Obra Digital", "0xa", "c2"),
            file("Álbum Retro", "0xa", "c3"),
        ];

        let hits = search(&files, "cd");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "CD-ROM 1998");

        let hits = search(&files, "ÁLBUM");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cid, "c3");

        assert_eq!(search(&files, "  ").len(), 3);
        assert!(search(&files, "zip").is_empty());
    }

    #[test]
    fn test_owned_by() {
        let files = vec![
            file("a", "0xABC", "c1"),
            file("b", "0xdef", "c2"),
            file("c", "Unknown", "c3"),
        ];
        let mine = owned_by(&files, "0xabc");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].cid, "c1");
        assert!(owned_by(&files, "").is_empty());
    }

    #[test]
    fn test_find_by_cid() {
        let files = vec![file("a", "0x1", "c1"), file("b", "0x1", "c2")];
        assert_eq!(find_by_cid(&files, "c2").unwrap().name, "b");
        assert!(find_by_cid(&files, "c3").is_none());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(0), "0.00 KB");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x55191fa9c937e97759f1cef854f331f84040406e"),
            "0x5519...406e"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
    }
}
