//! 客户服务

use std::sync::Arc;

use tracing::{info, instrument};

use super::product_service::{optional_text, required_text};
use crate::error::{InventoryError, Result};
use crate::models::{
    is_valid_document, normalize_document, Client, ClientFilter, NewClient, PageRequest, Paged,
};
use crate::repository::{ClientRepositoryTrait, ProductRepositoryTrait, Repositories};
use crate::service::dto::ClientPatch;

/// 客户服务
pub struct ClientService {
    clients: Arc<dyn ClientRepositoryTrait>,
    products: Arc<dyn ProductRepositoryTrait>,
}

impl ClientService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            clients: repos.clients.clone(),
            products: repos.products.clone(),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewClient) -> Result<Client> {
        let input = NewClient {
            name: required_text(&input.name, "客户名称")?,
            document: checked_document(&input.document)?,
            email: optional_text(input.email),
            phone: optional_text(input.phone),
            address: optional_text(input.address),
            contact_person: optional_text(input.contact_person),
        };

        let client = self.clients.create(&input).await?;
        info!(client_id = client.id, "客户已创建");
        Ok(client)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: ClientPatch) -> Result<Client> {
        let mut client = self.load(id).await?;

        if let Some(name) = &patch.name {
            client.name = required_text(name, "客户名称")?;
        }
        if let Some(document) = &patch.document {
            client.document = checked_document(document)?;
        }
        if patch.email.is_some() {
            client.email = optional_text(patch.email);
        }
        if patch.phone.is_some() {
            client.phone = optional_text(patch.phone);
        }
        if patch.address.is_some() {
            client.address = optional_text(patch.address);
        }
        if patch.contact_person.is_some() {
            client.contact_person = optional_text(patch.contact_person);
        }
        if let Some(active) = patch.active {
            client.active = active;
        }

        let updated = self.clients.update(&client).await?;
        info!(client_id = id, "客户已更新");
        Ok(updated)
    }

    /// 删除客户
    ///
    /// 仍有在库产品时拒绝；有历史产品时仓储改为停用
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.load(id).await?;
        let products = self.products.count_active_by_client(id).await?;
        if products > 0 {
            return Err(InventoryError::ClientHasProducts {
                client_id: id,
                products,
            });
        }

        self.clients.delete(id).await?;
        info!(client_id = id, "客户已删除");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Client> {
        self.load(id).await
    }

    pub async fn list(&self, filter: ClientFilter, page: PageRequest) -> Result<Paged<Client>> {
        self.clients.list(&filter, page).await
    }

    async fn load(&self, id: i64) -> Result<Client> {
        self.clients
            .get(id)
            .await?
            .ok_or(InventoryError::ClientNotFound(id))
    }
}

fn checked_document(document: &str) -> Result<String> {
    if !is_valid_document(document) {
        return Err(InventoryError::Validation(
            "证件号必须为 11 位 CPF 或 14 位 CNPJ".to_string(),
        ));
    }
    Ok(normalize_document(document))
}
