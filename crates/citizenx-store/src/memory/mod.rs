//! Process-local backend. All tables sit behind a single mutex, so every repository
//! call is atomic with respect to every other, standing in for the database's
//! transactions.

mod posts;
mod reports;
mod users;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use citizenx_model::{
    Blacklist, BookmarkReport, IncidentReport, Lga, Post, ReportType, Reward, State, SubReport,
    User, UserId, UserImage,
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    blacklist: Vec<Blacklist>,
    user_images: Vec<UserImage>,
    reports: HashMap<Uuid, IncidentReport>,
    rewards: Vec<Reward>,
    bookmarks: HashSet<BookmarkReport>,
    lgas: HashMap<Uuid, Lga>,
    states: HashMap<Uuid, State>,
    report_types: HashMap<Uuid, ReportType>,
    sub_reports: HashMap<Uuid, SubReport>,
    posts: BTreeMap<i64, Post>,
    sequence: i64,
}

impl Tables {
    /// Next value of the shared id sequence; ids start at 1.
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }
}

/// In-memory implementation of every repository trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}
