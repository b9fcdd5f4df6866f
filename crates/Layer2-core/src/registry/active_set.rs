//! Active Set - capability 하나의 활성 인스턴스 집합
//!
//! 읽기는 lock 없이 `Arc<Vec<..>>` 스냅샷을 고정(pin)하고, 쓰기는 복사본을 만들어
//! compare-and-swap 으로 게시합니다. 독자는 항상 완전한 이전 또는 다음 집합만 봅니다.

use arc_swap::ArcSwap;
use dirsrv_foundation::Dn;
use std::sync::Arc;

/// 활성 인스턴스 한 개
pub struct ActiveEntry<T: ?Sized> {
    pub dn: Dn,
    pub instance: Arc<T>,
}

impl<T: ?Sized> Clone for ActiveEntry<T> {
    fn clone(&self) -> Self {
        Self {
            dn: self.dn.clone(),
            instance: Arc::clone(&self.instance),
        }
    }
}

/// 활성 인스턴스 집합
pub struct ActiveSet<T: ?Sized> {
    snap: ArcSwap<Vec<ActiveEntry<T>>>,
}

impl<T: ?Sized> Default for ActiveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ActiveSet<T> {
    pub fn new() -> Self {
        Self {
            snap: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// 현재 스냅샷
    pub fn snapshot(&self) -> Arc<Vec<ActiveEntry<T>>> {
        self.snap.load_full()
    }

    /// 인스턴스 등록. 같은 식별자의 기존 인스턴스는 같은 게시에서 교체되어 반환됩니다.
    pub fn register(&self, dn: Dn, instance: Arc<T>) -> Option<Arc<T>> {
        self.update(|entries| {
            let replaced = match entries.iter().position(|e| e.dn == dn) {
                Some(index) => Some(std::mem::replace(&mut entries[index].instance, Arc::clone(&instance))),
                None => {
                    entries.push(ActiveEntry {
                        dn: dn.clone(),
                        instance: Arc::clone(&instance),
                    });
                    None
                }
            };
            (true, replaced)
        })
    }

    /// 인스턴스 등록 해제 (인스턴스 identity 기준)
    pub fn deregister(&self, instance: &Arc<T>) -> bool {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|e| !Arc::ptr_eq(&e.instance, instance));
            let removed = entries.len() != before;
            (removed, removed)
        })
    }

    /// 활성 인스턴스 목록
    pub fn list_active(&self) -> Vec<Arc<T>> {
        self.snap.load().iter().map(|e| Arc::clone(&e.instance)).collect()
    }

    /// 식별자로 조회
    pub fn get(&self, dn: &Dn) -> Option<Arc<T>> {
        self.snap
            .load()
            .iter()
            .find(|e| &e.dn == dn)
            .map(|e| Arc::clone(&e.instance))
    }

    /// 인스턴스가 게시되어 있는지
    pub fn contains(&self, instance: &Arc<T>) -> bool {
        self.snap.load().iter().any(|e| Arc::ptr_eq(&e.instance, instance))
    }

    pub fn len(&self) -> usize {
        self.snap.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snap.load().is_empty()
    }

    /// 복사본을 수정해 게시. `f` 는 (변경 여부, 결과) 를 반환합니다.
    fn update<R>(&self, mut f: impl FnMut(&mut Vec<ActiveEntry<T>>) -> (bool, R)) -> R {
        loop {
            let cur = self.snap.load_full();
            let mut next: Vec<ActiveEntry<T>> = cur.iter().cloned().collect();

            let (changed, result) = f(&mut next);
            if !changed {
                return result;
            }

            let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                return result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Item(&'static str);

    impl Named for Item {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn dn(name: &str) -> Dn {
        Dn::parse(&format!("cn={},cn=config", name)).unwrap()
    }

    #[test]
    fn test_register_and_deregister() {
        let set: ActiveSet<dyn Named> = ActiveSet::new();
        let a: Arc<dyn Named> = Arc::new(Item("a"));
        let b: Arc<dyn Named> = Arc::new(Item("b"));

        assert!(set.register(dn("a"), Arc::clone(&a)).is_none());
        assert!(set.register(dn("b"), Arc::clone(&b)).is_none());
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));

        assert!(set.deregister(&a));
        assert!(!set.deregister(&a));
        assert_eq!(set.list_active().len(), 1);
        assert_eq!(set.get(&dn("b")).map(|i| i.name().to_string()), Some("b".to_string()));
    }

    #[test]
    fn test_register_replaces_same_dn() {
        let set: ActiveSet<dyn Named> = ActiveSet::new();
        let old: Arc<dyn Named> = Arc::new(Item("old"));
        let new: Arc<dyn Named> = Arc::new(Item("new"));

        set.register(dn("x"), Arc::clone(&old));
        let replaced = set.register(dn("X"), Arc::clone(&new)).unwrap();

        assert!(Arc::ptr_eq(&replaced, &old));
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&old));
        assert!(set.contains(&new));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let set: ActiveSet<dyn Named> = ActiveSet::new();
        let a: Arc<dyn Named> = Arc::new(Item("a"));
        set.register(dn("a"), Arc::clone(&a));

        let pinned = set.snapshot();
        set.deregister(&a);

        assert_eq!(pinned.len(), 1);
        assert!(set.is_empty());
    }
}
