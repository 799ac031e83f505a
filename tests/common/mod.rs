// Shared models for the integration tests
#![allow(dead_code)]

use graft_core::{Constructor, Member, Reflect, TypeInfo};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Active,
    OnHold,
    Closed,
}

impl Reflect for Status {
    fn type_info() -> TypeInfo {
        TypeInfo::enumeration::<Status>("Status")
            .variant("Active", Status::Active, 0)
            .variant("OnHold", Status::OnHold, 1)
            .variant("Closed", Status::Closed, 5)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Reflect for Address {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Address>("Address")
            .member(Member::property("Street", |a: &Address| &a.street, |a: &mut Address, v| a.street = v))
            .member(Member::property("City", |a: &Address| &a.city, |a: &mut Address, v| a.city = v))
            .default_constructor()
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub nickname: Option<String>,
    pub status: Status,
    pub home: Option<Address>,
    pub tags: Vec<String>,
    pub scores: BTreeMap<String, i32>,
}

impl Reflect for Person {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Person>("Person")
            .member(Member::property("Name", |p: &Person| &p.name, |p: &mut Person, v| p.name = v))
            .member(Member::property("Age", |p: &Person| &p.age, |p: &mut Person, v| p.age = v))
            .member(Member::property("Nickname", |p: &Person| &p.nickname, |p: &mut Person, v| p.nickname = v))
            .member(Member::property("Status", |p: &Person| &p.status, |p: &mut Person, v| p.status = v))
            .member(Member::property("Home", |p: &Person| &p.home, |p: &mut Person, v| p.home = v))
            .member(Member::property("Tags", |p: &Person| &p.tags, |p: &mut Person, v| p.tags = v).item_name("Tag"))
            .member(Member::property("Scores", |p: &Person| &p.scores, |p: &mut Person, v| p.scores = v))
            .default_constructor()
            .build()
    }
}

pub fn ada() -> Person {
    Person {
        name: "Ada".to_string(),
        age: 36,
        nickname: None,
        status: Status::OnHold,
        home: Some(Address {
            street: "12 St James's Square".to_string(),
            city: "London".to_string(),
        }),
        tags: vec!["math".to_string(), "engines".to_string()],
        scores: BTreeMap::from([("algebra".to_string(), 98), ("poetry".to_string(), 71)]),
    }
}

/// `class P { public string Name; public List<int> Nums; }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct P {
    pub name: String,
    pub nums: Vec<i32>,
}

impl Reflect for P {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<P>("P")
            .member(Member::field("Name", |p: &P| &p.name, |p: &mut P, v| p.name = v))
            .member(Member::field("Nums", |p: &P| &p.nums, |p: &mut P, v| p.nums = v))
            .default_constructor()
            .build()
    }
}

/// One public property, one public field and one non-public property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mixed {
    pub shown: String,
    pub field: i32,
    pub secret: bool,
}

impl Reflect for Mixed {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Mixed>("Mixed")
            .member(Member::property("Shown", |m: &Mixed| &m.shown, |m: &mut Mixed, v| m.shown = v))
            .member(Member::field("Field", |m: &Mixed| &m.field, |m: &mut Mixed, v| m.field = v))
            .member(Member::property("Secret", |m: &Mixed| &m.secret, |m: &mut Mixed, v| m.secret = v).non_public())
            .default_constructor()
            .build()
    }
}

/// A tree node whose children point back at their parent.
#[derive(Debug, Clone, Default)]
pub struct Folder {
    pub name: String,
    pub parent: Option<Rc<RefCell<Folder>>>,
    pub children: Vec<Rc<RefCell<Folder>>>,
}

impl Reflect for Folder {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Folder>("Folder")
            .member(Member::property("Name", |f: &Folder| &f.name, |f: &mut Folder, v| f.name = v))
            .member(Member::property("Parent", |f: &Folder| &f.parent, |f: &mut Folder, v| f.parent = v))
            .member(Member::property("Children", |f: &Folder| &f.children, |f: &mut Folder, v| f.children = v))
            .default_constructor()
            .build()
    }
}

/// Builds `root/child` with the back reference in place.
pub fn folder_pair() -> Rc<RefCell<Folder>> {
    let root = Rc::new(RefCell::new(Folder {
        name: "root".to_string(),
        ..Folder::default()
    }));
    let child = Rc::new(RefCell::new(Folder {
        name: "child".to_string(),
        parent: Some(root.clone()),
        children: Vec::new(),
    }));
    root.borrow_mut().children.push(child);
    root
}

/// Breaks the back references so the pair can be dropped.
pub fn release(root: &Rc<RefCell<Folder>>) {
    for child in root.borrow().children.iter() {
        child.borrow_mut().parent = None;
    }
}

/// A single-member wrapper used to round-trip scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Holder<T> {
    pub value: T,
}

impl<T: Reflect + Default> Reflect for Holder<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::object::<Holder<T>>("Holder")
            .member(Member::property("Value", |h: &Holder<T>| &h.value, |h: &mut Holder<T>, v| h.value = v))
            .constructor(Constructor::new(|| Holder { value: T::default() }))
            .build()
    }
}
