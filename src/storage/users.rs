//! User repository, persisted to users.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{User, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for User {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserData {
    users: Vec<User>,
}

pub struct UserRepository {
    path: PathBuf,
    users: Table<User>,
    /// Index: lowercase email -> user id
    by_email: RwLock<HashMap<String, UserId>>,
}

impl UserRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            users: Table::new(),
            by_email: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: UserData = read_json(&self.path)?;

        let mut by_email = self.by_email.write().map_err(|e| {
            TaxboxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        by_email.clear();
        for user in &file_data.users {
            by_email.insert(user.email.to_lowercase(), user.id);
        }

        self.users.replace_all(file_data.users)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let users = self.users.sorted_by_key(|u| u.email.clone())?;
        write_json_atomic(&self.path, &UserData { users })
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>, TaxboxError> {
        self.users.get(id)
    }

    /// Look up a user by e-mail (case-insensitive)
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, TaxboxError> {
        let id = {
            let by_email = self.by_email.read().map_err(|e| {
                TaxboxError::Storage(format!("Failed to acquire read lock: {}", e))
            })?;
            by_email.get(&email.trim().to_lowercase()).copied()
        };
        match id {
            Some(id) => self.users.get(id),
            None => Ok(None),
        }
    }

    pub fn get_all(&self) -> Result<Vec<User>, TaxboxError> {
        self.users.sorted_by_key(|u| u.email.clone())
    }

    pub fn upsert(&self, user: User) -> Result<(), TaxboxError> {
        let mut by_email = self.by_email.write().map_err(|e| {
            TaxboxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if let Some(old) = self.users.get(user.id)? {
            by_email.remove(&old.email.to_lowercase());
        }
        if let Some(existing) = by_email.get(&user.email.to_lowercase()) {
            if *existing != user.id {
                return Err(TaxboxError::Duplicate {
                    entity_type: "User",
                    identifier: user.email.clone(),
                });
            }
        }
        by_email.insert(user.email.to_lowercase(), user.id);
        self.users.upsert(user)
    }

    pub fn count(&self) -> Result<usize, TaxboxError> {
        self.users.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let repo = UserRepository::new(temp_dir.path().join("users.json"));
        repo.load().unwrap();

        repo.upsert(User::new("Somchai@Example.com", "Somchai")).unwrap();
        assert!(repo.get_by_email("SOMCHAI@example.com").unwrap().is_some());
        assert!(repo.get_by_email("other@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repo = UserRepository::new(temp_dir.path().join("users.json"));
        repo.upsert(User::new("a@example.com", "A")).unwrap();

        let err = repo.upsert(User::new("A@example.com", "Other")).unwrap_err();
        assert!(matches!(err, TaxboxError::Duplicate { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("users.json");
        let repo = UserRepository::new(path.clone());
        let user = User::new("a@example.com", "A");
        let id = user.id;
        repo.upsert(user).unwrap();
        repo.save().unwrap();

        let reloaded = UserRepository::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(id).unwrap().unwrap().name, "A");
        assert!(reloaded.get_by_email("a@example.com").unwrap().is_some());
    }
}
