//! 客户模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 客户（寄存种子的货主）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    /// CPF/CNPJ，只保留数字
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建客户
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

/// 客户查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFilter {
    /// 名称或证件号模糊匹配
    pub keyword: Option<String>,
    pub active: Option<bool>,
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        let keyword_ok = self.keyword.as_deref().is_none_or(|k| {
            let k = k.to_lowercase();
            client.name.to_lowercase().contains(&k) || client.document.contains(&k)
        });
        keyword_ok && self.active.is_none_or(|a| client.active == a)
    }
}

/// 证件号归一化：去掉 CPF/CNPJ 中的 . - / 等分隔符
pub fn normalize_document(document: &str) -> String {
    document.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// CPF 为 11 位，CNPJ 为 14 位
pub fn is_valid_document(document: &str) -> bool {
    let digits = normalize_document(document);
    matches!(digits.len(), 11 | 14)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_document() {
        assert_eq!(normalize_document("123.456.789-09"), "12345678909");
        assert_eq!(normalize_document("12.345.678/0001-95"), "12345678000195");
    }

    #[test]
    fn test_is_valid_document() {
        assert!(is_valid_document("123.456.789-09"));
        assert!(is_valid_document("12.345.678/0001-95"));
        assert!(!is_valid_document("1234"));
        assert!(!is_valid_document(""));
    }
}
