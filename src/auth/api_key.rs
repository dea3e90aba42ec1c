//! Sinh và so khớp khóa nội bộ giữa các service

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Bộ sinh khóa nội bộ
pub struct ApiKeyGenerator;

impl ApiKeyGenerator {
    /// Sinh khóa mới
    /// Định dạng: mr_ik_<32 ký tự ngẫu nhiên>
    pub fn generate() -> String {
        let random: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        format!("mr_ik_{}", random)
    }

    /// Băm khóa bằng SHA-256 để lưu trữ hoặc so khớp
    pub fn hash(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// So khớp qua hash — hai chuỗi hash luôn cùng độ dài
    /// nên phép so sánh không lộ độ dài khóa thật
    pub fn verify(provided: &str, expected: &str) -> bool {
        Self::hash(provided) == Self::hash(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let key = ApiKeyGenerator::generate();
        assert!(key.starts_with("mr_ik_"));
        assert_eq!(key.len(), 38); // "mr_ik_" (6 ký tự) + 32 ký tự
    }

    #[test]
    fn test_hash_is_deterministic() {
        let key = "test_key_123456789012345678901234567890";
        let hash1 = ApiKeyGenerator::hash(key);
        let hash2 = ApiKeyGenerator::hash(key);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_is_different_for_different_keys() {
        let hash1 = ApiKeyGenerator::hash("test_key_1234567890");
        let hash2 = ApiKeyGenerator::hash("test_key_0987654321");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_length() {
        // SHA-256 cho 64 ký tự hex
        assert_eq!(ApiKeyGenerator::hash("test_key").len(), 64);
    }

    #[test]
    fn test_verify() {
        let key = ApiKeyGenerator::generate();
        assert!(ApiKeyGenerator::verify(&key, &key));
        assert!(!ApiKeyGenerator::verify(&key, "khac-hoan-toan"));
    }
}
