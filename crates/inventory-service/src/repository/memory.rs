//! 内存存储
//!
//! 使用 DashMap 实现的进程内存储，实现全部仓储接口，适用于测试和本地开发。
//! 多表写入（产品提交、唯一性检查后插入）在一把写锁下串行执行，
//! 校验全部通过后才落表，保证与 PostgreSQL 实现一致的原子语义。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicI64, Ordering};

use super::traits::{
    ChamberRepositoryTrait, ClientRepositoryTrait, LocationRepositoryTrait, LocationStats,
    MovementRepositoryTrait, ProductRepositoryTrait, UserRepositoryTrait,
    WithdrawalRepositoryTrait,
};
use crate::error::{InventoryError, Result};
use crate::models::{
    Chamber, ChamberDimensions, Client, ClientFilter, CommitResult, Location, LocationChange,
    LocationFilter, LoginState, Movement, MovementFilter, NewChamber, NewClient, NewLocation,
    NewUser, PageRequest, Paged, Product, ProductCommit, ProductFilter, ProductStatus,
    ProductWrite, User, UserFilter, UserRole, WithdrawalFilter, WithdrawalRequest,
    WithdrawalStatus, WithdrawalWrite,
};

/// 单张内存表
#[derive(Debug)]
struct Table<T> {
    rows: DashMap<i64, T>,
    seq: AtomicI64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            seq: AtomicI64::new(0),
        }
    }

    fn next_id(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn insert(&self, id: i64, value: T) {
        self.rows.insert(id, value);
    }

    /// 返回数据的克隆，不持有锁
    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).map(|v| v.clone())
    }

    fn remove(&self, id: i64) -> Option<T> {
        self.rows.remove(&id).map(|(_, v)| v)
    }

    /// 按条件筛选，结果按 ID 升序
    fn list_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows: Vec<(i64, T)> = self
            .rows
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows.into_iter().map(|(_, v)| v).collect()
    }

    fn count_by<F>(&self, predicate: F) -> i64
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .iter()
            .filter(|entry| predicate(entry.value()))
            .count() as i64
    }

    fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.rows.iter().any(|entry| predicate(entry.value()))
    }
}

/// 内存仓储
#[derive(Debug)]
pub struct MemoryStore {
    users: Table<User>,
    clients: Table<Client>,
    chambers: Table<Chamber>,
    locations: Table<Location>,
    products: Table<Product>,
    movements: Table<Movement>,
    withdrawals: Table<WithdrawalRequest>,
    write_lock: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            clients: Table::new(),
            chambers: Table::new(),
            locations: Table::new(),
            products: Table::new(),
            movements: Table::new(),
            withdrawals: Table::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn location_chamber(&self, location_id: Option<i64>) -> Option<i64> {
        location_id
            .and_then(|id| self.locations.get(id))
            .map(|l| l.chamber_id)
    }

    /// 检查是否有其他产品占用了同一库位（对应 products_location_key 唯一索引）
    fn ensure_location_free_for(&self, product_id: i64, location_id: Option<i64>) -> Result<()> {
        if let Some(location_id) = location_id {
            let taken = self
                .products
                .any(|p| p.id != product_id && p.location_id == Some(location_id));
            if taken {
                return Err(InventoryError::LocationOccupied(location_id));
            }
        }
        Ok(())
    }

    /// 在暂存副本上应用库位变化，条件与 SQL 版本的条件更新一致
    fn stage_location_change(
        &self,
        staged: &mut HashMap<i64, Location>,
        change: LocationChange,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let location_id = change.location_id();
        let location = match staged.entry(location_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                self.locations
                    .get(location_id)
                    .ok_or(InventoryError::LocationNotFound(location_id))?,
            ),
        };

        match change {
            LocationChange::Occupy { weight_kg, .. } => {
                location.can_hold(weight_kg)?;
                location.occupied = true;
                location.current_weight_kg = weight_kg;
            }
            LocationChange::Release { .. } => {
                location.occupied = false;
                location.current_weight_kg = 0.0;
            }
            LocationChange::Reweigh { weight_kg, .. } => {
                if !location.occupied {
                    return Err(InventoryError::Internal(format!(
                        "库位状态异常: location_id={}",
                        location_id
                    )));
                }
                location.check_weight(weight_kg)?;
                location.current_weight_kg = weight_kg;
            }
        }
        location.updated_at = now;
        Ok(())
    }
}

fn sort_desc_by_time<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl ChamberRepositoryTrait for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Chamber>> {
        Ok(self.chambers.get(id))
    }

    async fn list(&self) -> Result<Vec<Chamber>> {
        let mut chambers = self.chambers.list_by(|_| true);
        chambers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(chambers)
    }

    async fn create(&self, chamber: &NewChamber) -> Result<Chamber> {
        let _guard = self.write_lock.lock();
        if self.chambers.any(|c| c.name == chamber.name) {
            return Err(InventoryError::DuplicateChamberName(chamber.name.clone()));
        }

        let now = Utc::now();
        let created = Chamber {
            id: self.chambers.next_id(),
            name: chamber.name.clone(),
            description: chamber.description.clone(),
            temperature_target: chamber.temperature_target,
            humidity_target: chamber.humidity_target,
            dimensions: chamber.dimensions,
            status: chamber.status,
            created_at: now,
            updated_at: now,
        };
        self.chambers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, chamber: &Chamber) -> Result<Chamber> {
        let _guard = self.write_lock.lock();
        let current = self
            .chambers
            .get(chamber.id)
            .ok_or(InventoryError::ChamberNotFound(chamber.id))?;
        if self
            .chambers
            .any(|c| c.id != chamber.id && c.name == chamber.name)
        {
            return Err(InventoryError::DuplicateChamberName(chamber.name.clone()));
        }

        let updated = Chamber {
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..chamber.clone()
        };
        self.chambers.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.chambers.get(id).is_none() {
            return Err(InventoryError::ChamberNotFound(id));
        }

        let occupied = self
            .locations
            .count_by(|l| l.chamber_id == id && l.occupied);
        if occupied > 0 {
            return Err(InventoryError::ChamberInUse {
                chamber_id: id,
                occupied,
            });
        }

        for location in self.locations.list_by(|l| l.chamber_id == id) {
            self.locations.remove(location.id);
        }
        self.chambers.remove(id);
        Ok(())
    }
}

#[async_trait]
impl LocationRepositoryTrait for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Location>> {
        Ok(self.locations.get(id))
    }

    async fn list(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let mut locations = self.locations.list_by(|l| filter.matches(l));
        locations.sort_by_key(|l| {
            let c = l.coordinates;
            (l.chamber_id, c.block, c.side, c.row, c.level)
        });
        Ok(locations)
    }

    async fn create(&self, location: &NewLocation) -> Result<Location> {
        let _guard = self.write_lock.lock();
        if self.locations.any(|l| {
            l.chamber_id == location.chamber_id && l.coordinates == location.coordinates
        }) {
            return Err(InventoryError::DuplicateLocation {
                chamber_id: location.chamber_id,
                code: location.code(),
            });
        }

        let now = Utc::now();
        let created = Location {
            id: self.locations.next_id(),
            chamber_id: location.chamber_id,
            coordinates: location.coordinates,
            code: location.code(),
            max_capacity_kg: location.max_capacity_kg,
            current_weight_kg: 0.0,
            occupied: false,
            active: location.active,
            created_at: now,
            updated_at: now,
        };
        self.locations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_many(&self, locations: &[NewLocation]) -> Result<u64> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();
        let mut inserted = 0;

        for location in locations {
            let exists = self.locations.any(|l| {
                l.chamber_id == location.chamber_id && l.coordinates == location.coordinates
            });
            if exists {
                continue;
            }
            let id = self.locations.next_id();
            self.locations.insert(
                id,
                Location {
                    id,
                    chamber_id: location.chamber_id,
                    coordinates: location.coordinates,
                    code: location.code(),
                    max_capacity_kg: location.max_capacity_kg,
                    current_weight_kg: 0.0,
                    occupied: false,
                    active: location.active,
                    created_at: now,
                    updated_at: now,
                },
            );
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn update(&self, location: &Location) -> Result<Location> {
        let _guard = self.write_lock.lock();
        let mut current = self
            .locations
            .get(location.id)
            .ok_or(InventoryError::LocationNotFound(location.id))?;

        if current.occupied && !location.active {
            return Err(InventoryError::LocationOccupied(current.id));
        }
        if current.current_weight_kg > location.max_capacity_kg {
            return Err(InventoryError::CapacityExceeded {
                location_id: current.id,
                capacity_kg: location.max_capacity_kg,
                requested_kg: current.current_weight_kg,
            });
        }

        current.max_capacity_kg = location.max_capacity_kg;
        current.active = location.active;
        current.updated_at = Utc::now();
        self.locations.insert(current.id, current.clone());
        Ok(current)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock();
        let location = self
            .locations
            .get(id)
            .ok_or(InventoryError::LocationNotFound(id))?;
        if location.occupied {
            return Err(InventoryError::LocationOccupied(id));
        }
        self.locations.remove(id);
        Ok(())
    }

    async fn stats(&self, chamber_id: i64) -> Result<LocationStats> {
        let locations = self.locations.list_by(|l| l.chamber_id == chamber_id);
        Ok(LocationStats {
            total_locations: locations.len() as i64,
            active_locations: locations.iter().filter(|l| l.active).count() as i64,
            occupied_locations: locations.iter().filter(|l| l.occupied).count() as i64,
            stored_weight_kg: locations.iter().map(|l| l.current_weight_kg).sum(),
            capacity_kg: locations
                .iter()
                .filter(|l| l.active)
                .map(|l| l.max_capacity_kg)
                .sum(),
        })
    }

    async fn count_outside(&self, chamber_id: i64, dimensions: ChamberDimensions) -> Result<i64> {
        Ok(self
            .locations
            .count_by(|l| l.chamber_id == chamber_id && !dimensions.contains(&l.coordinates)))
    }
}

#[async_trait]
impl ClientRepositoryTrait for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Client>> {
        Ok(self.clients.get(id))
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<Client>> {
        Ok(self
            .clients
            .list_by(|c| c.document == document)
            .into_iter()
            .next())
    }

    async fn list(&self, filter: &ClientFilter, page: PageRequest) -> Result<Paged<Client>> {
        let mut clients = self.clients.list_by(|c| filter.matches(c));
        clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(Paged::slice(clients, page))
    }

    async fn create(&self, client: &NewClient) -> Result<Client> {
        let _guard = self.write_lock.lock();
        if self.clients.any(|c| c.document == client.document) {
            return Err(InventoryError::DuplicateDocument(client.document.clone()));
        }

        let now = Utc::now();
        let created = Client {
            id: self.clients.next_id(),
            name: client.name.clone(),
            document: client.document.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            address: client.address.clone(),
            contact_person: client.contact_person.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.clients.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, client: &Client) -> Result<Client> {
        let _guard = self.write_lock.lock();
        let current = self
            .clients
            .get(client.id)
            .ok_or(InventoryError::ClientNotFound(client.id))?;
        if self
            .clients
            .any(|c| c.id != client.id && c.document == client.document)
        {
            return Err(InventoryError::DuplicateDocument(client.document.clone()));
        }

        let updated = Client {
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..client.clone()
        };
        self.clients.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut client = self
            .clients
            .get(id)
            .ok_or(InventoryError::ClientNotFound(id))?;

        if self.products.any(|p| p.client_id == id) {
            client.active = false;
            client.updated_at = Utc::now();
            self.clients.insert(id, client);
        } else {
            self.clients.remove(id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .list_by(|u| u.email.eq_ignore_ascii_case(email))
            .into_iter()
            .next())
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Paged<User>> {
        let mut users = self.users.list_by(|u| filter.matches(u));
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(Paged::slice(users, page))
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        let _guard = self.write_lock.lock();
        if self.users.any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(InventoryError::DuplicateEmail(user.email.clone()));
        }

        let now = Utc::now();
        let created = User {
            id: self.users.next_id(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let _guard = self.write_lock.lock();
        let current = self
            .users
            .get(user.id)
            .ok_or(InventoryError::UserNotFound(user.id))?;
        if self
            .users
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(InventoryError::DuplicateEmail(user.email.clone()));
        }

        let updated = User {
            last_login_at: current.last_login_at,
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..user.clone()
        };
        self.users.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn record_login(&self, id: i64, state: &LoginState) -> Result<()> {
        if let Some(mut user) = self.users.rows.get_mut(&id) {
            user.failed_login_attempts = state.failed_login_attempts;
            user.locked_until = state.locked_until;
            if state.last_login_at.is_some() {
                user.last_login_at = state.last_login_at;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut user = self.users.get(id).ok_or(InventoryError::UserNotFound(id))?;

        let referenced = self.products.any(|p| p.created_by == id)
            || self.movements.any(|m| m.user_id == id)
            || self
                .withdrawals
                .any(|w| w.requested_by == id || w.decided_by == Some(id));
        if referenced {
            user.active = false;
            user.updated_at = Utc::now();
            self.users.insert(id, user);
        } else {
            self.users.remove(id);
        }
        Ok(())
    }

    async fn count_active_admins(&self) -> Result<i64> {
        Ok(self
            .users
            .count_by(|u| u.role == UserRole::Admin && u.active))
    }
}

#[async_trait]
impl ProductRepositoryTrait for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.products.get(id))
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>> {
        let mut products = self
            .products
            .list_by(|p| filter.matches(p, self.location_chamber(p.location_id)));
        sort_desc_by_time(&mut products, |p| (p.updated_at, p.id));
        Ok(Paged::slice(products, page))
    }

    async fn commit(&self, commit: ProductCommit) -> Result<CommitResult> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        // 1. 产品行
        let product = match commit.product {
            ProductWrite::Insert(p) => {
                self.ensure_location_free_for(0, p.location_id)?;
                Product {
                    id: self.products.next_id(),
                    name: p.name,
                    lot: p.lot,
                    seed_type: p.seed_type,
                    quantity: p.quantity,
                    unit_weight_kg: p.unit_weight_kg,
                    total_weight_kg: p.total_weight_kg,
                    storage_type: p.storage_type,
                    client_id: p.client_id,
                    location_id: p.location_id,
                    status: p.status,
                    expiration_date: p.expiration_date,
                    notes: p.notes,
                    version: 1,
                    created_by: p.created_by,
                    created_at: now,
                    updated_at: now,
                }
            }
            ProductWrite::Update {
                product,
                expected_version,
            } => {
                let current = self
                    .products
                    .get(product.id)
                    .ok_or(InventoryError::ProductNotFound(product.id))?;
                if current.version != expected_version {
                    return Err(InventoryError::ConcurrencyConflict {
                        product_id: product.id,
                        expected_version,
                    });
                }
                self.ensure_location_free_for(product.id, product.location_id)?;
                Product {
                    version: current.version + 1,
                    created_by: current.created_by,
                    created_at: current.created_at,
                    updated_at: now,
                    ..product
                }
            }
        };

        // 2. 库位
        let mut staged = HashMap::new();
        for change in commit.locations {
            self.stage_location_change(&mut staged, change, now)?;
        }

        // 3. 出库申请
        let withdrawal = match commit.withdrawal {
            Some(WithdrawalWrite::Insert(w)) => {
                if self
                    .withdrawals
                    .any(|r| r.product_id == product.id && r.is_pending())
                {
                    return Err(InventoryError::WithdrawalAlreadyPending(product.id));
                }
                Some(WithdrawalRequest {
                    id: self.withdrawals.next_id(),
                    product_id: product.id,
                    requested_by: w.requested_by,
                    reason: w.reason,
                    quantity: w.quantity,
                    product_quantity: w.product_quantity,
                    status: WithdrawalStatus::Pending,
                    decided_by: None,
                    decided_at: None,
                    decision_note: None,
                    created_at: now,
                    updated_at: now,
                })
            }
            Some(WithdrawalWrite::Update(w)) => {
                let current = self
                    .withdrawals
                    .get(w.id)
                    .ok_or(InventoryError::WithdrawalNotFound(w.id))?;
                if !current.is_pending() {
                    return Err(InventoryError::WithdrawalNotPending(w.id));
                }
                Some(WithdrawalRequest {
                    status: w.status,
                    decided_by: w.decided_by,
                    decided_at: w.decided_at,
                    decision_note: w.decision_note,
                    updated_at: now,
                    ..current
                })
            }
            None => None,
        };

        // 4. 校验全部通过，落表
        let movement = commit.movement.map(|m| Movement {
            id: self.movements.next_id(),
            product_id: product.id,
            movement_type: m.movement_type,
            from_location_id: m.from_location_id,
            to_location_id: m.to_location_id,
            from_location_code: m.from_location_code,
            to_location_code: m.to_location_code,
            from_status: m.from_status,
            to_status: m.to_status,
            quantity: m.quantity,
            weight_kg: m.weight_kg,
            user_id: m.user_id,
            reason: m.reason,
            automatic: m.automatic,
            created_at: now,
        });

        self.products.insert(product.id, product.clone());
        for (id, location) in staged {
            self.locations.insert(id, location);
        }
        if let Some(m) = &movement {
            self.movements.insert(m.id, m.clone());
        }
        if let Some(w) = &withdrawal {
            self.withdrawals.insert(w.id, w.clone());
        }

        Ok(CommitResult {
            product,
            movement,
            withdrawal,
        })
    }

    async fn count_by_status(&self) -> Result<Vec<(ProductStatus, i64)>> {
        Ok(ProductStatus::ALL
            .into_iter()
            .map(|s| (s, self.products.count_by(|p| p.status == s)))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn count_active_by_client(&self, client_id: i64) -> Result<i64> {
        Ok(self
            .products
            .count_by(|p| p.client_id == client_id && !p.status.is_terminal()))
    }
}

#[async_trait]
impl MovementRepositoryTrait for MemoryStore {
    async fn list(&self, filter: &MovementFilter, page: PageRequest) -> Result<Paged<Movement>> {
        let mut movements = self.movements.list_by(|m| filter.matches(m));
        sort_desc_by_time(&mut movements, |m| (m.created_at, m.id));
        Ok(Paged::slice(movements, page))
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        Ok(self.movements.count_by(|m| m.created_at >= since))
    }
}

#[async_trait]
impl WithdrawalRepositoryTrait for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<WithdrawalRequest>> {
        Ok(self.withdrawals.get(id))
    }

    async fn list(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<Paged<WithdrawalRequest>> {
        let mut withdrawals = self.withdrawals.list_by(|w| filter.matches(w));
        sort_desc_by_time(&mut withdrawals, |w| (w.created_at, w.id));
        Ok(Paged::slice(withdrawals, page))
    }

    async fn find_pending_by_product(&self, product_id: i64) -> Result<Option<WithdrawalRequest>> {
        Ok(self
            .withdrawals
            .list_by(|w| w.product_id == product_id && w.is_pending())
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Coordinates, MovementType, NewMovement, NewProduct, NewWithdrawal, StorageType,
    };

    async fn seed_location(store: &MemoryStore, capacity: f64) -> Location {
        LocationRepositoryTrait::create(
            store,
            &NewLocation {
                chamber_id: 1,
                coordinates: Coordinates::new(1, 1, 1, 1),
                max_capacity_kg: capacity,
                active: true,
            },
        )
        .await
        .unwrap()
    }

    fn new_product(location_id: Option<i64>, status: ProductStatus) -> NewProduct {
        NewProduct {
            name: "Milho AG 1051".to_string(),
            lot: "L-2026-01".to_string(),
            seed_type: Some("MILHO".to_string()),
            quantity: 20,
            unit_weight_kg: 20.0,
            total_weight_kg: 400.0,
            storage_type: StorageType::Bag,
            client_id: 1,
            location_id,
            status,
            expiration_date: None,
            notes: None,
            created_by: 1,
        }
    }

    fn entry_movement(location_id: i64) -> NewMovement {
        NewMovement {
            movement_type: MovementType::Entry,
            from_location_id: None,
            to_location_id: Some(location_id),
            from_location_code: None,
            to_location_code: Some("Q01-L1-F01-A1".to_string()),
            from_status: None,
            to_status: ProductStatus::Locado,
            quantity: 20,
            weight_kg: 400.0,
            user_id: 1,
            reason: None,
            automatic: true,
        }
    }

    #[tokio::test]
    async fn test_commit_insert_occupies_location() {
        let store = MemoryStore::new();
        let loc = seed_location(&store, 500.0).await;

        let result = store
            .commit(
                ProductCommit::insert(new_product(Some(loc.id), ProductStatus::Locado))
                    .with_location(LocationChange::Occupy {
                        location_id: loc.id,
                        weight_kg: 400.0,
                    })
                    .with_movement(entry_movement(loc.id)),
            )
            .await
            .unwrap();

        assert_eq!(result.product.version, 1);
        let movement = result.movement.unwrap();
        assert_eq!(movement.product_id, result.product.id);

        let stored = LocationRepositoryTrait::get(&store, loc.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.occupied);
        assert_eq!(stored.current_weight_kg, 400.0);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_trace() {
        let store = MemoryStore::new();
        let loc = seed_location(&store, 100.0).await;

        let err = store
            .commit(
                ProductCommit::insert(new_product(Some(loc.id), ProductStatus::Locado))
                    .with_location(LocationChange::Occupy {
                        location_id: loc.id,
                        weight_kg: 400.0,
                    })
                    .with_movement(entry_movement(loc.id)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::CapacityExceeded { .. }));
        let page = ProductRepositoryTrait::list(
            &store,
            &ProductFilter::default(),
            PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(store.count_since(Utc::now() - chrono::Duration::hours(1)).await.unwrap(), 0);
        assert!(
            !LocationRepositoryTrait::get(&store, loc.id)
                .await
                .unwrap()
                .unwrap()
                .occupied
        );
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryStore::new();
        let created = store
            .commit(ProductCommit::insert(new_product(None, ProductStatus::Cadastrado)))
            .await
            .unwrap()
            .product;

        let mut edited = created.clone();
        edited.notes = Some("primeira edição".to_string());
        let updated = store
            .commit(ProductCommit::update(edited.clone(), created.version))
            .await
            .unwrap()
            .product;
        assert_eq!(updated.version, 2);

        // 仍然使用旧版本号
        let err = store
            .commit(ProductCommit::update(edited, created.version))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::ConcurrencyConflict {
                expected_version: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_second_pending_withdrawal_rejected() {
        let store = MemoryStore::new();
        let product = store
            .commit(ProductCommit::insert(new_product(None, ProductStatus::Locado)))
            .await
            .unwrap()
            .product;

        let request = NewWithdrawal {
            requested_by: 1,
            reason: "venda".to_string(),
            quantity: 5,
            product_quantity: 20,
        };
        let first = store
            .commit(
                ProductCommit::update(product.clone(), product.version)
                    .with_withdrawal(WithdrawalWrite::Insert(request.clone())),
            )
            .await
            .unwrap();
        assert!(first.withdrawal.unwrap().is_pending());

        let err = store
            .commit(
                ProductCommit::update(first.product.clone(), first.product.version)
                    .with_withdrawal(WithdrawalWrite::Insert(request)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::WithdrawalAlreadyPending(_)));
    }

    #[tokio::test]
    async fn test_occupied_location_stays_active() {
        let store = MemoryStore::new();
        let loc = seed_location(&store, 500.0).await;
        let mut stale = loc.clone();

        store
            .commit(
                ProductCommit::insert(new_product(Some(loc.id), ProductStatus::Locado))
                    .with_location(LocationChange::Occupy {
                        location_id: loc.id,
                        weight_kg: 400.0,
                    }),
            )
            .await
            .unwrap();

        // 基于占用前读到的快照停用
        stale.active = false;
        let err = LocationRepositoryTrait::update(&store, &stale)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::LocationOccupied(id) if id == loc.id));

        let stored = LocationRepositoryTrait::get(&store, loc.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.active);
        assert!(stored.occupied);
    }

    #[tokio::test]
    async fn test_chamber_delete_blocked_by_occupied_location() {
        let store = MemoryStore::new();
        let chamber = ChamberRepositoryTrait::create(
            &store,
            &NewChamber {
                name: "Câmara 01".to_string(),
                description: None,
                temperature_target: Some(10.0),
                humidity_target: Some(50.0),
                dimensions: ChamberDimensions::new(1, 1, 1, 1),
                status: Default::default(),
            },
        )
        .await
        .unwrap();
        let loc = seed_location(&store, 500.0).await;
        assert_eq!(loc.chamber_id, chamber.id);

        store
            .commit(
                ProductCommit::insert(new_product(Some(loc.id), ProductStatus::Locado))
                    .with_location(LocationChange::Occupy {
                        location_id: loc.id,
                        weight_kg: 400.0,
                    }),
            )
            .await
            .unwrap();

        let err = ChamberRepositoryTrait::delete(&store, chamber.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::ChamberInUse { occupied: 1, .. }
        ));
    }
}
