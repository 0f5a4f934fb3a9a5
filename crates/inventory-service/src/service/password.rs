//! 密码处理
//!
//! 提供密码哈希和验证功能

use bcrypt::{hash, verify};

use crate::error::{InventoryError, Result};

pub use bcrypt::DEFAULT_COST;

/// bcrypt 允许的最低 cost
pub const MIN_COST: u32 = 4;

/// 对密码进行哈希处理
///
/// 使用 bcrypt 算法生成密码哈希，cost 在测试中可降到 MIN_COST
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    hash(password, cost).map_err(|e| InventoryError::Internal(format!("密码哈希失败: {}", e)))
}

/// 验证密码
///
/// 比较明文密码与存储的哈希值
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    verify(password, hash).map_err(|e| InventoryError::Internal(format!("密码验证失败: {}", e)))
}

/// 密码强度：至少 8 位，同时包含字母和数字
pub fn check_password_strength(password: &str) -> Result<()> {
    let long_enough = password.chars().count() >= 8;
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(InventoryError::Validation(
            "密码至少 8 位，且需同时包含字母和数字".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "senha_teste_123";
        let hashed = hash_password(password, MIN_COST).unwrap();

        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("senha_errada", &hashed).unwrap());
    }

    #[test]
    fn test_password_strength() {
        assert!(check_password_strength("armazem2026").is_ok());
        assert!(check_password_strength("curta1").is_err());
        assert!(check_password_strength("somenteletras").is_err());
        assert!(check_password_strength("1234567890").is_err());
    }
}
