//! Cascade deletion. The closure of a delete is computed up front as a [`DeletionPlan`] and then
//! applied deepest kind first, so no intermediate state holds a dangling reference.

use crate::error::AppError;
use crate::model::{EntityKind, Id};
use crate::store::{ReferenceIndex, Transaction};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Every row removed by deleting one root row, grouped by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionPlan {
    root: (EntityKind, Id),
    ids: BTreeMap<EntityKind, BTreeSet<Id>>,
}

impl DeletionPlan {
    /// Walks the "owns" edges from the root through the reference index. Read-only.
    pub async fn compute<I>(index: &mut I, kind: EntityKind, id: Id) -> Result<Self, AppError>
    where
        I: ReferenceIndex + ?Sized,
    {
        let mut ids: BTreeMap<EntityKind, BTreeSet<Id>> = BTreeMap::new();
        ids.entry(kind).or_default().insert(id);
        let mut frontier = VecDeque::from([(kind, id)]);
        while let Some((parent_kind, parent_id)) = frontier.pop_front() {
            for fk in parent_kind.referenced_by() {
                for child in index.referencing(fk, parent_id).await? {
                    // A comment can be reached both through its author and its article.
                    if ids.entry(fk.owner).or_default().insert(child) {
                        frontier.push_back((fk.owner, child));
                    }
                }
            }
        }
        Ok(DeletionPlan {
            root: (kind, id),
            ids,
        })
    }

    pub fn root(&self) -> (EntityKind, Id) {
        self.root
    }

    /// Deletion order: deepest kind first, the root's kind last. Ids ascend within a step.
    pub fn steps(&self) -> Vec<(EntityKind, Vec<Id>)> {
        let mut steps: Vec<(EntityKind, Vec<Id>)> = self
            .ids
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(kind, set)| (*kind, set.iter().copied().collect()))
            .collect();
        steps.sort_by(|a, b| b.0.depth().cmp(&a.0.depth()));
        steps
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.ids.get(&kind).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.ids.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, kind: EntityKind, id: Id) -> bool {
        self.ids.get(&kind).is_some_and(|set| set.contains(&id))
    }

    /// Deletes every planned row inside `tx`. Rows already gone are skipped. Any storage error
    /// aborts; the caller drops the transaction and nothing is removed.
    pub async fn apply(&self, tx: &mut dyn Transaction) -> Result<(), AppError> {
        for (kind, ids) in self.steps() {
            for id in ids {
                tx.delete(kind, id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForeignKey, ARTICLE_AUTHOR, ARTICLE_CATEGORY, COMMENT_ARTICLE, COMMENT_AUTHOR};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Static foreign-key index: (fk column on owner, target id) -> dependent ids.
    #[derive(Default)]
    struct FakeIndex {
        edges: HashMap<(EntityKind, &'static str, Id), Vec<Id>>,
    }

    impl FakeIndex {
        fn link(mut self, fk: &'static ForeignKey, target: Id, dependents: &[Id]) -> Self {
            self.edges
                .insert((fk.owner, fk.column, target), dependents.to_vec());
            self
        }
    }

    #[async_trait]
    impl ReferenceIndex for FakeIndex {
        async fn referencing(&mut self, fk: &'static ForeignKey, target_id: Id) -> Result<Vec<Id>, AppError> {
            Ok(self
                .edges
                .get(&(fk.owner, fk.column, target_id))
                .cloned()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn user_plan_includes_comments_on_authored_articles() {
        // user 1 wrote articles 10, 11 and comment 100; comment 101 (by someone else) is on article 10.
        let mut index = FakeIndex::default()
            .link(&ARTICLE_AUTHOR, 1, &[10, 11])
            .link(&COMMENT_AUTHOR, 1, &[100])
            .link(&COMMENT_ARTICLE, 10, &[100, 101]);
        let plan = DeletionPlan::compute(&mut index, EntityKind::User, 1).await.unwrap();

        assert_eq!(
            plan.steps(),
            vec![
                (EntityKind::Comment, vec![100, 101]),
                (EntityKind::Article, vec![10, 11]),
                (EntityKind::User, vec![1]),
            ]
        );
        assert_eq!(plan.len(), 5);
    }

    #[tokio::test]
    async fn category_plan_mirrors_user_plan() {
        let mut index = FakeIndex::default()
            .link(&ARTICLE_CATEGORY, 2, &[20])
            .link(&COMMENT_ARTICLE, 20, &[200, 201]);
        let plan = DeletionPlan::compute(&mut index, EntityKind::Category, 2).await.unwrap();

        assert_eq!(
            plan.steps(),
            vec![
                (EntityKind::Comment, vec![200, 201]),
                (EntityKind::Article, vec![20]),
                (EntityKind::Category, vec![2]),
            ]
        );
        assert_eq!(plan.root(), (EntityKind::Category, 2));
    }

    #[tokio::test]
    async fn article_plan_removes_its_comments_first() {
        let mut index = FakeIndex::default().link(&COMMENT_ARTICLE, 5, &[50]);
        let plan = DeletionPlan::compute(&mut index, EntityKind::Article, 5).await.unwrap();
        assert_eq!(
            plan.steps(),
            vec![(EntityKind::Comment, vec![50]), (EntityKind::Article, vec![5])]
        );
    }

    #[tokio::test]
    async fn comment_plan_is_just_the_comment() {
        let mut index = FakeIndex::default();
        let plan = DeletionPlan::compute(&mut index, EntityKind::Comment, 7).await.unwrap();
        assert_eq!(plan.steps(), vec![(EntityKind::Comment, vec![7])]);
        assert!(plan.contains(EntityKind::Comment, 7));
        assert_eq!(plan.count(EntityKind::Article), 0);
    }
}
