//! 自然排序
//!
//! 文件名中的连续数字按数值比较：`batch2.json` 排在 `batch10.json` 之前。

use std::cmp::Ordering;
use std::path::PathBuf;

/// 文件名切分后的片段，文本与数字交替出现，且总以文本开头（可能为空）
#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Text(String),
    Digits(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_digits = false;

    for (idx, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if idx > start && is_digit != in_digits {
            parts.push(make_chunk(&s[start..idx], in_digits));
            start = idx;
        }
        if idx == start {
            in_digits = is_digit;
        }
    }
    if start < s.len() {
        parts.push(make_chunk(&s[start..], in_digits));
    }

    if matches!(parts.first(), Some(Chunk::Digits(_))) {
        parts.insert(0, Chunk::Text(String::new()));
    }
    parts
}

fn make_chunk(part: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(part)
    } else {
        Chunk::Text(part.to_lowercase())
    }
}

/// 按数值比较两个数字串，不受长度限制
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
        (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
    }
}

/// 自然顺序比较
///
/// 片段全部相等时（如 `batch01` 与 `batch1`、大小写不同）再按原字符串比较，保证全序。
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = cmp_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

/// 按自然顺序排序字符串
pub fn sort_naturally<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

/// 按文件名的自然顺序排序路径
pub fn sort_paths_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let a_name = a.file_name().unwrap_or_default().to_string_lossy();
        let b_name = b.file_name().unwrap_or_default().to_string_lossy();
        natural_cmp(&a_name, &b_name).then_with(|| a.cmp(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_files_sort_numerically() {
        let mut names = vec!["batch10.json", "batch2.json", "batch1.json"];
        sort_naturally(&mut names);
        assert_eq!(names, vec!["batch1.json", "batch2.json", "batch10.json"]);
    }

    #[test]
    fn test_case_insensitive_text() {
        let mut names = vec!["Batch3.json", "batch20.json", "BATCH1.json"];
        sort_naturally(&mut names);
        assert_eq!(names, vec!["BATCH1.json", "Batch3.json", "batch20.json"]);
    }

    #[test]
    fn test_leading_digits_and_long_numbers() {
        assert_eq!(natural_cmp("2-a", "10-a"), Ordering::Less);
        assert_eq!(
            natural_cmp("batch99999999999999999999999.json", "batch100000000000000000000000.json"),
            Ordering::Less
        );
        assert_eq!(natural_cmp("12", "a"), Ordering::Less);
    }

    #[test]
    fn test_total_order_tie_break() {
        assert_ne!(natural_cmp("batch01.json", "batch1.json"), Ordering::Equal);
        assert_eq!(natural_cmp("batch1.json", "batch1.json"), Ordering::Equal);
        let forward = natural_cmp("batch01.json", "batch1.json");
        assert_eq!(natural_cmp("batch1.json", "batch01.json"), forward.reverse());
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("batch", "batch1"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_paths_sort_by_file_name() {
        let mut paths = vec![
            PathBuf::from("/out/batch12.json"),
            PathBuf::from("/out/batch3.json"),
        ];
        sort_paths_naturally(&mut paths);
        assert_eq!(paths[0], PathBuf::from("/out/batch3.json"));
    }
}
