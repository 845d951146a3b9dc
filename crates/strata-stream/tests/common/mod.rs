//! Shared model for the stream integration tests.
//!
//! `Employee` extends `Person` by embedding it: two relations per employee,
//! a `Vec` of phones hanging off the person table, and a single badge
//! hanging off the employee table. `Manager` extends `Employee` with an
//! unnamed table, so its fields land in the employee row.

#![allow(dead_code)]

use chrono::NaiveDate;
use strata_store::{Backend, ChildQuery, Criteria, InMemoryBackend, Row, StoreError, StoreResult};
use strata_stream::{ChainBuilder, CollectionBinding, FieldBinding, Persist, TableDescriptor};
use strata_types::{Entity, EntityId, Persistent};

macro_rules! record_entity {
    ($ty:ty) => {
        impl Entity for $ty {
            fn persistent(&self) -> &Persistent {
                &self.record
            }
            fn persistent_mut(&mut self) -> &mut Persistent {
                &mut self.record
            }
        }
    };
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// Person / Employee / Manager
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

fn address_fields() -> Vec<FieldBinding<Address>> {
    vec![
        FieldBinding::new("street", |a: &Address| &a.street, |a: &mut Address| &mut a.street),
        FieldBinding::new("city", |a: &Address| &a.city, |a: &mut Address| &mut a.city),
    ]
}

#[derive(Clone, Debug, Default)]
pub struct Phone {
    pub record: Persistent,
    pub kind: String,
    pub number: String,
}

record_entity!(Phone);

impl Persist for Phone {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(
            TableDescriptor::named("phone")
                .field("kind", |p: &Phone| &p.kind, |p: &mut Phone| &mut p.kind)
                .field("number", |p: &Phone| &p.number, |p: &mut Phone| &mut p.number),
        );
    }
}

pub fn phone(kind: &str, number: &str) -> Phone {
    Phone {
        record: Persistent::new(),
        kind: kind.into(),
        number: number.into(),
    }
}

#[derive(Clone, Debug, Default)]
pub struct Person {
    pub record: Persistent,
    pub name: String,
    pub born: NaiveDate,
    pub home: Address,
    pub phones: Vec<Phone>,
}

record_entity!(Person);

impl Persist for Person {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(
            TableDescriptor::named("person")
                .field("name", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
                .bind(
                    FieldBinding::new("born", |p: &Person| &p.born, |p: &mut Person| &mut p.born)
                        .with_format("%d.%m.%Y"),
                )
                .embed(|p: &Person| &p.home, |p: &mut Person| &mut p.home, address_fields())
                .collection(
                    CollectionBinding::many("phones", |p: &mut Person| &mut p.phones)
                        .foreign_key("person_id"),
                ),
        );
    }
}

#[derive(Clone, Debug, Default)]
pub struct Badge {
    pub record: Persistent,
    pub code: String,
}

record_entity!(Badge);

impl Persist for Badge {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(TableDescriptor::named("badge").field(
            "code",
            |b: &Badge| &b.code,
            |b: &mut Badge| &mut b.code,
        ));
    }
}

#[derive(Clone, Debug, Default)]
pub struct Employee {
    pub person: Person,
    pub salary: f64,
    pub active: bool,
    pub badge: Badge,
}

impl Entity for Employee {
    fn persistent(&self) -> &Persistent {
        self.person.persistent()
    }
    fn persistent_mut(&mut self) -> &mut Persistent {
        self.person.persistent_mut()
    }
}

impl Persist for Employee {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain
            .table(
                TableDescriptor::named("employee")
                    .field("salary", |e: &Employee| &e.salary, |e: &mut Employee| &mut e.salary)
                    .field("active", |e: &Employee| &e.active, |e: &mut Employee| &mut e.active)
                    .collection(CollectionBinding::single("badge", |e: &mut Employee| {
                        &mut e.badge
                    })),
            )
            .inherit::<Person>(|e: &Employee| &e.person, |e: &mut Employee| &mut e.person);
    }
}

pub fn employee() -> Employee {
    Employee {
        person: Person {
            record: Persistent::new(),
            name: "Ada".into(),
            born: NaiveDate::from_ymd_opt(1990, 12, 24).unwrap_or_default(),
            home: Address {
                street: "1 Loop Lane".into(),
                city: "Turing".into(),
            },
            phones: vec![
                phone("home", "111"),
                phone("work", "222"),
                phone("mobile", "333"),
            ],
        },
        salary: 5120.5,
        active: true,
        badge: Badge {
            record: Persistent::new(),
            code: "B-7".into(),
        },
    }
}

#[derive(Clone, Debug, Default)]
pub struct Manager {
    pub employee: Employee,
    pub reports: i32,
}

impl Entity for Manager {
    fn persistent(&self) -> &Persistent {
        self.employee.persistent()
    }
    fn persistent_mut(&mut self) -> &mut Persistent {
        self.employee.persistent_mut()
    }
}

impl Persist for Manager {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain
            .table(TableDescriptor::unnamed().field(
                "reports",
                |m: &Manager| &m.reports,
                |m: &mut Manager| &mut m.reports,
            ))
            .inherit::<Employee>(|m: &Manager| &m.employee, |m: &mut Manager| &mut m.employee);
    }
}

// ---------------------------------------------------------------------------
// Naming edge cases
// ---------------------------------------------------------------------------

/// No relation name anywhere in its chain.
#[derive(Clone, Debug, Default)]
pub struct Draft {
    pub record: Persistent,
    pub text: String,
}

record_entity!(Draft);

impl Persist for Draft {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(TableDescriptor::unnamed().field(
            "text",
            |d: &Draft| &d.text,
            |d: &mut Draft| &mut d.text,
        ));
    }
}

/// Named leaf over an unnamed base: the base borrows the leaf's relation.
#[derive(Clone, Debug, Default)]
pub struct Memo {
    pub draft: Draft,
    pub author: String,
}

impl Entity for Memo {
    fn persistent(&self) -> &Persistent {
        self.draft.persistent()
    }
    fn persistent_mut(&mut self) -> &mut Persistent {
        self.draft.persistent_mut()
    }
}

impl Persist for Memo {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain
            .table(TableDescriptor::named("memo").field(
                "author",
                |m: &Memo| &m.author,
                |m: &mut Memo| &mut m.author,
            ))
            .inherit::<Draft>(|m: &Memo| &m.draft, |m: &mut Memo| &mut m.draft);
    }
}

// ---------------------------------------------------------------------------
// Collection edge cases
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct Tag {
    pub record: Persistent,
    pub label: String,
}

record_entity!(Tag);

impl Persist for Tag {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(TableDescriptor::named("tag").field(
            "label",
            |t: &Tag| &t.label,
            |t: &mut Tag| &mut t.label,
        ));
    }
}

pub fn tag(label: &str) -> Tag {
    Tag {
        record: Persistent::new(),
        label: label.into(),
    }
}

/// Two collections of one child type, told apart by collection id.
#[derive(Clone, Debug, Default)]
pub struct Post {
    pub record: Persistent,
    pub title: String,
    pub tags: Vec<Tag>,
    pub hidden: Vec<Tag>,
}

record_entity!(Post);

impl Persist for Post {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(
            TableDescriptor::named("post")
                .field("title", |p: &Post| &p.title, |p: &mut Post| &mut p.title)
                .collection(
                    CollectionBinding::many("tags", |p: &mut Post| &mut p.tags).collection_id(1),
                )
                .collection(
                    CollectionBinding::many("hidden", |p: &mut Post| &mut p.hidden)
                        .collection_id(2),
                ),
        );
    }
}

/// Same as [`Post`] but without collection ids.
#[derive(Clone, Debug, Default)]
pub struct Thread {
    pub record: Persistent,
    pub tags: Vec<Tag>,
    pub hidden: Vec<Tag>,
}

record_entity!(Thread);

impl Persist for Thread {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(
            TableDescriptor::named("thread")
                .collection(CollectionBinding::many("tags", |t: &mut Thread| &mut t.tags))
                .collection(CollectionBinding::many("hidden", |t: &mut Thread| &mut t.hidden)),
        );
    }
}

/// A folder containing folders.
#[derive(Clone, Debug, Default)]
pub struct Folder {
    pub record: Persistent,
    pub name: String,
    pub children: Vec<Folder>,
}

record_entity!(Folder);

impl Persist for Folder {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(
            TableDescriptor::named("folder")
                .field("name", |f: &Folder| &f.name, |f: &mut Folder| &mut f.name)
                .collection(CollectionBinding::many("children", |f: &mut Folder| &mut f.children)),
        );
    }
}

#[derive(Clone, Debug, Default)]
pub struct Counter {
    pub record: Persistent,
    pub hits: i64,
}

record_entity!(Counter);

impl Persist for Counter {
    fn describe(chain: &mut ChainBuilder<Self>) {
        chain.table(TableDescriptor::named("counter").field(
            "hits",
            |c: &Counter| &c.hits,
            |c: &mut Counter| &mut c.hits,
        ));
    }
}

// ---------------------------------------------------------------------------
// Backend that fails inserts into one relation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FlakyBackend {
    pub inner: InMemoryBackend,
    pub fail_inserts_into: Option<&'static str>,
}

impl Backend for FlakyBackend {
    fn begin(&mut self) -> StoreResult<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.inner.rollback()
    }

    fn insert(&mut self, relation: &str, id: EntityId, row: &Row) -> StoreResult<EntityId> {
        if self.fail_inserts_into == Some(relation) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.insert(relation, id, row)
    }

    fn update(&mut self, relation: &str, id: EntityId, row: &Row) -> StoreResult<u64> {
        self.inner.update(relation, id, row)
    }

    fn delete(&mut self, relation: &str, id: EntityId) -> StoreResult<u64> {
        self.inner.delete(relation, id)
    }

    fn fetch(&mut self, relation: &str, id: EntityId) -> StoreResult<Option<Row>> {
        self.inner.fetch(relation, id)
    }

    fn find(&mut self, relation: &str, criteria: &Criteria) -> StoreResult<Vec<(EntityId, Row)>> {
        self.inner.find(relation, criteria)
    }

    fn query_children(
        &mut self,
        relation: &str,
        query: &ChildQuery<'_>,
    ) -> StoreResult<Vec<(EntityId, Row)>> {
        self.inner.query_children(relation, query)
    }

    fn next_id(&mut self, relation: &str) -> StoreResult<EntityId> {
        Backend::next_id(&mut self.inner, relation)
    }
}
