//! In-process stores used when no database is configured, and by tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use forensight_core::{CaseId, Email, ImageDigest, UserId};

use super::{CaseStore, RepositoryError, UserStore};
use crate::models::{Case, CaseUpdate, NewCase, User};

#[derive(Default)]
struct UserTable {
    next_id: i32,
    by_email: HashMap<Email, (User, String)>,
}

/// [`UserStore`] backed by a `HashMap` keyed on normalized email.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<UserTable>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let mut table = self.inner.write().await;
        if table.by_email.contains_key(email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        table.next_id += 1;
        let user = User {
            id: UserId::new(table.next_id),
            email: email.clone(),
            created_at: Utc::now(),
        };
        table
            .by_email
            .insert(email.clone(), (user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self.inner.read().await.by_email.get(email).cloned())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let table = self.inner.read().await;
        Ok(table
            .by_email
            .values()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Default)]
struct CaseTable {
    next_id: i32,
    cases: HashMap<CaseId, Case>,
    analyzed: HashMap<CaseId, HashSet<ImageDigest>>,
}

impl CaseTable {
    fn owned(&self, owner: UserId, id: CaseId) -> Option<&Case> {
        self.cases.get(&id).filter(|case| case.owner == owner)
    }
}

/// [`CaseStore`] backed by `HashMap`s.
#[derive(Default)]
pub struct MemoryCaseStore {
    inner: RwLock<CaseTable>,
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn create(&self, owner: UserId, new: NewCase) -> Result<Case, RepositoryError> {
        let mut table = self.inner.write().await;
        table.next_id += 1;
        let now = Utc::now();
        let case = Case {
            id: CaseId::new(table.next_id),
            owner,
            title: new.title,
            description: new.description,
            case_type: new.case_type,
            status: new.status,
            location: new.location,
            date_of_incident: new.date_of_incident,
            tags: new.tags,
            created_at: now,
            updated_at: now,
        };
        table.cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Case>, RepositoryError> {
        let table = self.inner.read().await;
        let mut cases: Vec<Case> = table
            .cases
            .values()
            .filter(|case| case.owner == owner)
            .cloned()
            .collect();
        // ids are monotonic, so they break ties between equal timestamps
        cases.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(cases)
    }

    async fn get(&self, owner: UserId, id: CaseId) -> Result<Option<Case>, RepositoryError> {
        Ok(self.inner.read().await.owned(owner, id).cloned())
    }

    async fn update(
        &self,
        owner: UserId,
        id: CaseId,
        update: CaseUpdate,
    ) -> Result<Option<Case>, RepositoryError> {
        let mut table = self.inner.write().await;
        let Some(case) = table.cases.get_mut(&id).filter(|case| case.owner == owner) else {
            return Ok(None);
        };
        update.apply(case, Utc::now());
        Ok(Some(case.clone()))
    }

    async fn delete(&self, owner: UserId, id: CaseId) -> Result<bool, RepositoryError> {
        let mut table = self.inner.write().await;
        if table.owned(owner, id).is_none() {
            return Ok(false);
        }
        table.cases.remove(&id);
        table.analyzed.remove(&id);
        Ok(true)
    }

    async fn record_analyzed(
        &self,
        owner: UserId,
        id: CaseId,
        digests: &[ImageDigest],
    ) -> Result<bool, RepositoryError> {
        let mut table = self.inner.write().await;
        if table.owned(owner, id).is_none() {
            return Ok(false);
        }
        table
            .analyzed
            .entry(id)
            .or_default()
            .extend(digests.iter().cloned());
        Ok(true)
    }

    async fn is_analyzed(
        &self,
        owner: UserId,
        id: CaseId,
        digest: &ImageDigest,
    ) -> Result<bool, RepositoryError> {
        let table = self.inner.read().await;
        if table.owned(owner, id).is_none() {
            return Ok(false);
        }
        Ok(table
            .analyzed
            .get(&id)
            .is_some_and(|set| set.contains(digest)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryUserStore::default();
        store.create(&email("a@b.com"), "hash").await.unwrap();

        let err = store.create(&email("A@B.com"), "hash2").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let (_, hash) = store
            .find_credentials(&email("a@b.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_concurrent_signups_store_one_user() {
        let store = Arc::new(MemoryUserStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create(&email("race@lab.org"), "h").await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = MemoryUserStore::default();
        let user = store.create(&email("id@lab.org"), "h").await.unwrap();
        let found = store.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.email, user.email);
        assert!(store.get_by_id(UserId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cases_scoped_by_owner() {
        let store = MemoryCaseStore::default();
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        let case = store.create(alice, NewCase::titled("Alley")).await.unwrap();

        assert!(store.get(alice, case.id).await.unwrap().is_some());
        assert!(store.get(bob, case.id).await.unwrap().is_none());
        assert!(store.list_for_owner(bob).await.unwrap().is_empty());
        assert!(
            store
                .update(bob, case.id, CaseUpdate::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.delete(bob, case.id).await.unwrap());
        assert!(store.delete(alice, case.id).await.unwrap());
        assert!(store.get(alice, case.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryCaseStore::default();
        let owner = UserId::new(1);
        let first = store.create(owner, NewCase::titled("first")).await.unwrap();
        let second = store.create(owner, NewCase::titled("second")).await.unwrap();

        let ids: Vec<CaseId> = store
            .list_for_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_analyzed_set() {
        let store = MemoryCaseStore::default();
        let owner = UserId::new(1);
        let case = store.create(owner, NewCase::titled("scene")).await.unwrap();
        let seen = ImageDigest::of(b"seen");
        let unseen = ImageDigest::of(b"unseen");

        assert!(
            store
                .record_analyzed(owner, case.id, &[seen.clone(), seen.clone()])
                .await
                .unwrap()
        );
        assert!(store.is_analyzed(owner, case.id, &seen).await.unwrap());
        assert!(!store.is_analyzed(owner, case.id, &unseen).await.unwrap());
        assert!(!store.is_analyzed(UserId::new(2), case.id, &seen).await.unwrap());

        assert!(
            !store
                .record_analyzed(UserId::new(2), case.id, &[unseen])
                .await
                .unwrap()
        );

        store.delete(owner, case.id).await.unwrap();
        assert!(!store.is_analyzed(owner, case.id, &seen).await.unwrap());
    }
}
