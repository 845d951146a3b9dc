//! Binding chains: how one type lineage maps onto one or more relations.
//!
//! A type extending another persistent type embeds it as a member and
//! inherits its chain through [`ChainBuilder::inherit`]. The resulting chain
//! lists one [`TableDescriptor`] per type in the lineage, most-derived
//! first. Every relation row written for one entity carries the same id.
//!
//! # Invariants
//!
//! - Relation names are resolved once, when the chain is built. A
//!   descriptor without a name takes its nearest named ancestor's; if no
//!   ancestor is named it takes its nearest named descendant's.
//! - Descriptors resolving to the same relation share one row.
//! - Two collections of the same child type and relation carry distinct
//!   collection ids.

use std::any::type_name;
use std::any::TypeId;
use std::fmt;

use strata_types::Entity;

use crate::binding::collection::CollectionBinding;
use crate::binding::registry;
use crate::binding::table::TableDescriptor;
use crate::error::BindError;

/// A type whose values can be written to and read from a backend.
///
/// ```ignore
/// impl Persist for Employee {
///     fn describe(chain: &mut ChainBuilder<Self>) {
///         chain
///             .table(TableDescriptor::named("employee").field(
///                 "salary",
///                 |e| &e.salary,
///                 |e| &mut e.salary,
///             ))
///             .inherit::<Person>(|e| &e.person, |e| &mut e.person);
///     }
/// }
/// ```
pub trait Persist: Entity + Default + 'static {
    /// Describe the chain, most-derived table first.
    fn describe(chain: &mut ChainBuilder<Self>);

    /// The cached chain of this type, built on first use.
    fn binding() -> Result<&'static BindingChain<Self>, BindError> {
        registry::chain::<Self>()
    }
}

/// Collects the tables of a chain during [`Persist::describe`].
pub struct ChainBuilder<E> {
    tables: Vec<TableDescriptor<E>>,
}

impl<E: 'static> ChainBuilder<E> {
    pub(crate) fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Append the next table of the lineage.
    pub fn table(&mut self, table: TableDescriptor<E>) -> &mut Self {
        self.tables.push(table);
        self
    }

    /// Append the whole chain of the embedded base type `B`.
    pub fn inherit<B: Persist>(
        &mut self,
        get: fn(&E) -> &B,
        get_mut: fn(&mut E) -> &mut B,
    ) -> &mut Self {
        let mut base = ChainBuilder::<B>::new();
        B::describe(&mut base);
        self.tables
            .extend(base.tables.into_iter().map(|t| t.lift(get, get_mut)));
        self
    }

    pub(crate) fn build(self) -> Result<BindingChain<E>, BindError> {
        let entity = type_name::<E>();
        if self.tables.is_empty() {
            return Err(BindError::EmptyChain { entity });
        }

        let declared: Vec<Option<&'static str>> =
            self.tables.iter().map(TableDescriptor::relation).collect();
        let resolved = resolve_relations(&declared);

        let mut segments: Vec<Segment> = Vec::new();
        if resolved.iter().all(Option::is_some) {
            for (index, &relation) in resolved.iter().flatten().enumerate() {
                match segments.iter_mut().find(|s| s.relation == relation) {
                    Some(segment) => segment.tables.push(index),
                    None => segments.push(Segment {
                        relation,
                        tables: vec![index],
                    }),
                }
            }
        }

        let chain = BindingChain {
            entity,
            tables: self.tables,
            resolved,
            segments,
        };
        chain.check_collections()?;
        Ok(chain)
    }
}

/// Each descriptor's effective relation: its own name, else the nearest
/// named ancestor's (later in the chain), else the nearest named
/// descendant's.
fn resolve_relations(declared: &[Option<&'static str>]) -> Vec<Option<&'static str>> {
    (0..declared.len())
        .map(|i| {
            declared[i..]
                .iter()
                .find_map(|r| *r)
                .or_else(|| declared[..i].iter().rev().find_map(|r| *r))
        })
        .collect()
}

/// The tables of a chain that share one relation row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub(crate) relation: &'static str,
    pub(crate) tables: Vec<usize>,
}

/// Immutable descriptor chain of one type, most-derived table first.
pub struct BindingChain<E> {
    entity: &'static str,
    tables: Vec<TableDescriptor<E>>,
    resolved: Vec<Option<&'static str>>,
    segments: Vec<Segment>,
}

impl<E> BindingChain<E> {
    /// Type name of the bound entity.
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn tables(&self) -> &[TableDescriptor<E>] {
        &self.tables
    }

    /// Number of tables in the lineage.
    pub fn depth(&self) -> usize {
        self.tables.len()
    }

    /// Effective relation of the table at `index`.
    pub fn relation_of(&self, index: usize) -> Option<&'static str> {
        self.resolved.get(index).copied().flatten()
    }

    /// Relation of the most-derived table.
    pub fn outer_relation(&self) -> Option<&'static str> {
        self.relation_of(0)
    }

    /// Relation of the root table; ids are scoped to it.
    pub fn root_relation(&self) -> Option<&'static str> {
        self.resolved.last().copied().flatten()
    }

    /// Distinct relations written per entity, most-derived first.
    pub fn relations(&self) -> Vec<&'static str> {
        self.segments.iter().map(|s| s.relation).collect()
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every collection binding across all tables, most-derived first.
    pub fn collections(&self) -> impl Iterator<Item = &CollectionBinding<E>> {
        self.tables.iter().flat_map(|t| t.collections().iter())
    }

    pub(crate) fn check_acyclic(
        &self,
        path: &mut Vec<(TypeId, &'static str)>,
    ) -> Result<(), BindError> {
        for collection in self.collections() {
            collection.check_acyclic(path)?;
        }
        Ok(())
    }

    fn check_collections(&self) -> Result<(), BindError> {
        let all: Vec<&CollectionBinding<E>> = self.collections().collect();
        for (i, first) in all.iter().enumerate() {
            for second in &all[i + 1..] {
                let same_target = first.child_type() == second.child_type()
                    && first.relation_override() == second.relation_override();
                let distinguished = matches!(
                    (first.collection_id_value(), second.collection_id_value()),
                    (Some(a), Some(b)) if a != b
                );
                if same_target && !distinguished {
                    return Err(BindError::AmbiguousCollection {
                        entity: self.entity,
                        relation: first
                            .relation_override()
                            .unwrap_or(first.child_type_name())
                            .to_owned(),
                        first: first.member(),
                        second: second.member(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<E> fmt::Debug for BindingChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingChain")
            .field("entity", &self.entity)
            .field("relations", &self.relations())
            .field("tables", &self.tables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::collection::CollectionBinding;
    use strata_types::Persistent;

    #[test]
    fn fall_through_prefers_ancestors() {
        let declared = [None, Some("derived"), None, Some("root")];
        assert_eq!(
            resolve_relations(&declared),
            vec![Some("derived"), Some("derived"), Some("root"), Some("root")]
        );
    }

    #[test]
    fn unnamed_root_falls_back_to_descendant() {
        let declared = [Some("leaf"), None];
        assert_eq!(resolve_relations(&declared), vec![Some("leaf"), Some("leaf")]);
    }

    #[test]
    fn all_unnamed_stays_unresolved() {
        assert_eq!(resolve_relations(&[None, None]), vec![None, None]);
    }

    proptest::proptest! {
        #[test]
        fn one_name_resolves_every_table(
            declared in proptest::collection::vec(
                proptest::option::of(proptest::sample::select(vec!["a", "b", "c"])),
                1..8,
            )
        ) {
            let resolved = resolve_relations(&declared);
            let any_named = declared.iter().any(Option::is_some);
            proptest::prop_assert!(resolved.iter().all(|r| r.is_some() == any_named));
            for (own, effective) in declared.iter().zip(&resolved) {
                if own.is_some() {
                    proptest::prop_assert_eq!(own, effective);
                }
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    struct Tag {
        record: Persistent,
        label: String,
    }

    impl Entity for Tag {
        fn persistent(&self) -> &Persistent {
            &self.record
        }
        fn persistent_mut(&mut self) -> &mut Persistent {
            &mut self.record
        }
    }

    impl Persist for Tag {
        fn describe(chain: &mut ChainBuilder<Self>) {
            chain.table(TableDescriptor::named("tag").field(
                "label",
                |t: &Tag| &t.label,
                |t: &mut Tag| &mut t.label,
            ));
        }
    }

    #[derive(Clone, Debug, Default)]
    struct Post {
        record: Persistent,
        title: String,
        tags: Vec<Tag>,
        hidden: Vec<Tag>,
    }

    impl Entity for Post {
        fn persistent(&self) -> &Persistent {
            &self.record
        }
        fn persistent_mut(&mut self) -> &mut Persistent {
            &mut self.record
        }
    }

    fn post_table() -> TableDescriptor<Post> {
        TableDescriptor::named("post").field(
            "title",
            |p: &Post| &p.title,
            |p: &mut Post| &mut p.title,
        )
    }

    #[test]
    fn empty_chain_is_rejected() {
        let err = ChainBuilder::<Post>::new().build().unwrap_err();
        assert!(matches!(err, BindError::EmptyChain { .. }));
    }

    #[test]
    fn same_relation_tables_share_a_segment() {
        let mut builder = ChainBuilder::<Post>::new();
        builder
            .table(TableDescriptor::unnamed())
            .table(post_table());
        let chain = builder.build().unwrap();
        assert_eq!(chain.relations(), vec!["post"]);
        assert_eq!(chain.segments()[0].tables, vec![0, 1]);
        assert_eq!(chain.outer_relation(), Some("post"));
        assert_eq!(chain.root_relation(), Some("post"));
    }

    #[test]
    fn unnamed_chain_builds_without_segments() {
        let mut builder = ChainBuilder::<Post>::new();
        builder.table(TableDescriptor::unnamed());
        let chain = builder.build().unwrap();
        assert!(chain.relations().is_empty());
        assert_eq!(chain.root_relation(), None);
    }

    #[test]
    fn duplicate_child_collections_need_distinct_ids() {
        let mut builder = ChainBuilder::<Post>::new();
        builder.table(
            post_table()
                .collection(CollectionBinding::many("tags", |p: &mut Post| &mut p.tags))
                .collection(CollectionBinding::many("hidden", |p: &mut Post| &mut p.hidden)),
        );
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            BindError::AmbiguousCollection {
                first: "tags",
                second: "hidden",
                ..
            }
        ));

        let mut builder = ChainBuilder::<Post>::new();
        builder.table(
            post_table()
                .collection(
                    CollectionBinding::many("tags", |p: &mut Post| &mut p.tags).collection_id(1),
                )
                .collection(
                    CollectionBinding::many("hidden", |p: &mut Post| &mut p.hidden)
                        .collection_id(2),
                ),
        );
        let chain = builder.build().unwrap();
        assert_eq!(chain.collections().count(), 2);
    }

    #[test]
    fn distinct_relation_overrides_are_not_ambiguous() {
        let mut builder = ChainBuilder::<Post>::new();
        builder.table(
            post_table()
                .collection(CollectionBinding::many("tags", |p: &mut Post| &mut p.tags))
                .collection(
                    CollectionBinding::many("hidden", |p: &mut Post| &mut p.hidden)
                        .relation("hidden_tag"),
                ),
        );
        assert!(builder.build().is_ok());
    }
}
