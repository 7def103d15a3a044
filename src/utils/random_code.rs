//! 取件码生成
//!
//! 字母表为大写字母与数字，去掉容易混淆的 `0`/`O` 与 `1`/`I`。
//! 冲突检测由存储层负责，这里只负责均匀随机地挑选字符。

use rand::Rng;

pub const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// 生成指定长度的取件码
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// 去除首尾空白并转为大写
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// 长度正确且只包含字母表内字符
pub fn is_well_formed_code(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_excludes_ambiguous() {
        for ch in [b'0', b'O', b'1', b'I'] {
            assert!(!CODE_ALPHABET.contains(&ch));
        }
        assert_eq!(CODE_ALPHABET.len(), 32);
    }

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..200 {
            let code = generate_code(8);
            assert_eq!(code.len(), 8);
            assert!(is_well_formed_code(&code, 8));
        }
        assert_eq!(generate_code(6).len(), 6);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab3k7mzq \n"), "AB3K7MZQ");
    }

    #[test]
    fn test_well_formed_rejects_bad_input() {
        assert!(!is_well_formed_code("ABCDEFG", 8));
        assert!(!is_well_formed_code("ABCDEFG0", 8));
        assert!(!is_well_formed_code("ABCDEFGI", 8));
        assert!(!is_well_formed_code("abcdefgh", 8));
        assert!(is_well_formed_code("ABCDEFGH", 8));
    }
}
