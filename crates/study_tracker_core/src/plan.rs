//! crates/study_tracker_core/src/plan.rs
//!
//! The fixed 75-day study plan and the catalog of atomic tasks derived from it.
//!
//! The hand-authored table lists one record per day with a comma-joined topic
//! string. The catalog expands every record into one `Task` per topic, splitting
//! only on commas that sit outside parentheses, so a topic such as
//! "Monetary Policy (Repo, Reverse Repo, MSF)" stays a single task.

use crate::domain::Task;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::OnceLock;

/// Number of days in the plan. Day numbers run from 1 to this value inclusive.
pub const PLAN_DAYS: u32 = 75;

/// What kind of work a plan day is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Study,
    Test,
    FullLengthTest,
    Buffer,
    Revision,
    Exam,
}

impl DayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayKind::Study => "Study",
            DayKind::Test => "Test",
            DayKind::FullLengthTest => "FLT",
            DayKind::Buffer => "Buffer",
            DayKind::Revision => "Revision",
            DayKind::Exam => "Exam",
        }
    }
}

/// The four phases the plan is grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    BreakingTheWeaknessBarrier,
    CoreStaticAndGeography,
    DynamicShift,
    Simulation,
}

impl Phase {
    pub fn for_day(day: u32) -> Self {
        match day {
            0..=20 => Phase::BreakingTheWeaknessBarrier,
            21..=40 => Phase::CoreStaticAndGeography,
            41..=60 => Phase::DynamicShift,
            _ => Phase::Simulation,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Phase::BreakingTheWeaknessBarrier => 1,
            Phase::CoreStaticAndGeography => 2,
            Phase::DynamicShift => 3,
            Phase::Simulation => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::BreakingTheWeaknessBarrier => "Breaking the Weakness Barrier",
            Phase::CoreStaticAndGeography => "Core Static & Geography",
            Phase::DynamicShift => "Dynamic Shift (Env + S&T)",
            Phase::Simulation => "Simulation",
        }
    }
}

/// One row of the hand-authored plan table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRecord {
    pub day: u32,
    pub subject: &'static str,
    pub topics: &'static str,
    pub kind: DayKind,
}

impl DayRecord {
    pub const fn new(day: u32, subject: &'static str, topics: &'static str, kind: DayKind) -> Self {
        Self {
            day,
            subject,
            topics,
            kind,
        }
    }
}

#[rustfmt::skip]
pub const PLAN_TABLE: [DayRecord; PLAN_DAYS as usize] = [
    DayRecord::new(1, "Economy & History", "RBI Functions, Monetary Policy (Repo, Reverse Repo, MSF), Decline of Mughals, Advent of Europeans", DayKind::Study),
    DayRecord::new(2, "Polity & History", "Regulating Act 1773 to 1935 Act, Preamble, Battle of Plassey & Buxar", DayKind::Study),
    DayRecord::new(3, "Economy & Testing", "MCLR vs Base Rate, BASEL III Norms, Mid-Week Test: Economy Banking Basics", DayKind::Test),
    DayRecord::new(4, "Economy & History", "Inflation (CPI, WPI, GDP Deflator), IIP, Revolt of 1857 (Leaders/Causes)", DayKind::Study),
    DayRecord::new(5, "Polity & History", "Socio-Religious Reforms (Raja Ram Mohan Roy, Arya Samaj), Citizenship, Fundamental Rights (12-35)", DayKind::Study),
    DayRecord::new(6, "Full Length Test", "FLT 1 (Basic NCERT Level), Weekend Upskilling Block", DayKind::FullLengthTest),
    DayRecord::new(7, "Economy & History", "Budget Terms (Deficits), FRBM Act, Formation of INC, Moderates vs Extremists", DayKind::Study),
    DayRecord::new(8, "Economy & History", "GST Council & Slabs, Partition of Bengal (1905), Swadeshi Movement", DayKind::Study),
    DayRecord::new(9, "Polity & History", "Surat Split, DPSP, Fundamental Duties, Amendment Procedure", DayKind::Study),
    DayRecord::new(10, "History Testing", "Mid-Week Test: Modern History (1857-1905)", DayKind::Test),
    DayRecord::new(11, "Economy & History", "BoP, Current/Capital Account, Forex, Ghadar Movement, Komagata Maru", DayKind::Study),
    DayRecord::new(12, "Economy & History", "NEER vs REER, FDI vs FII, Home Rule League, Lucknow Pact 1916", DayKind::Study),
    DayRecord::new(13, "Polity", "President, Vice-President, Governor (Pardoning powers)", DayKind::Study),
    DayRecord::new(14, "Full Length Test", "FLT 2, Weekend Upskilling Block", DayKind::FullLengthTest),
    DayRecord::new(15, "Buffer/Review", "Review FLT 2 Mistakes, Catch up on backlog", DayKind::Buffer),
    DayRecord::new(16, "Economy & History", "Money Market (T-Bills), Capital Market (SEBI, IPOs), Gandhi's Entry (Champaran/Kheda)", DayKind::Study),
    DayRecord::new(17, "History & Polity", "Rowlatt Act, Jallianwala Bagh, Non-Cooperation, Parliament Sessions", DayKind::Study),
    DayRecord::new(18, "Polity", "Bills (Money vs Finance), Budget Process, Parliamentary Committees", DayKind::Study),
    DayRecord::new(19, "Polity Testing", "Mid-Week Test: Polity (Executive & Parliament)", DayKind::Test),
    DayRecord::new(20, "Review Phase 1", "Consolidate Notes for Eco/History/Polity", DayKind::Buffer),
    DayRecord::new(21, "Economy & History", "Agriculture (MSP, FRP), WTO Boxes, Simon Commission, Nehru Report", DayKind::Study),
    DayRecord::new(22, "Geography & History", "Interior of Earth, Earthquakes, Volcanoes, Civil Disobedience (Dandi)", DayKind::Study),
    DayRecord::new(23, "Geography & History", "Continental Drift, Round Table Conferences, Poona Pact", DayKind::Study),
    DayRecord::new(24, "Full Length Test", "FLT 3, Weekend Upskilling Block", DayKind::FullLengthTest),
    DayRecord::new(25, "Economy", "Five Year Plans, NITI Aayog, Poverty Committees (Tendulkar/Rangarajan)", DayKind::Study),
    DayRecord::new(26, "History", "GoI Act 1935, Quit India Movement, INA Trials", DayKind::Study),
    DayRecord::new(27, "Geography & History", "Atmosphere Layers, Cyclones, Cabinet Mission, Mountbatten Plan", DayKind::Study),
    DayRecord::new(28, "Geography Testing", "Mid-Week Test: Geography (Physical)", DayKind::Test),
    DayRecord::new(29, "IR & Mapping", "West Asia (Israel-Palestine, Red Sea), Central Asia Groupings", DayKind::Study),
    DayRecord::new(30, "Polity & IR", "Supreme Court vs High Court (Writs), South China Sea Dispute", DayKind::Study),
    DayRecord::new(31, "Geography", "Oceanography (Currents, Salinity, Coral Bleaching)", DayKind::Study),
    DayRecord::new(32, "Full Length Test", "FLT 4, Weekend Upskilling Block", DayKind::FullLengthTest),
    DayRecord::new(33, "Polity", "Constitutional Bodies (ECI, UPSC, CAG, Finance Comm)", DayKind::Study),
    DayRecord::new(34, "Polity", "Non-Constitutional Bodies (NHRC, CIC, CVC), Tribunals", DayKind::Study),
    DayRecord::new(35, "Geography", "Indian Physical (Himalayas, Plateau), River Systems (Indus, Ganga)", DayKind::Study),
    DayRecord::new(36, "Geography & IR", "River Systems (Godavari, Krishna, Kaveri), India's Neighborhood Disputes", DayKind::Study),
    DayRecord::new(37, "Mixed Testing", "Mid-Week Test: Mixed (History + Polity)", DayKind::Test),
    DayRecord::new(38, "IR", "Indian Ocean Rim (IOR), Important Straits and Canals", DayKind::Study),
    DayRecord::new(39, "Buffer", "Catch up on Geography & Mapping", DayKind::Buffer),
    DayRecord::new(40, "Review Phase 2", "Consolidate Geography & IR Notes", DayKind::Buffer),
    DayRecord::new(41, "Environment", "Ecology Basics (Ecotone, Niche), Biodiversity Levels", DayKind::Study),
    DayRecord::new(42, "Sci-Tech", "Space (Orbits LEO/GEO, Launch Vehicles, Chandrayaan)", DayKind::Study),
    DayRecord::new(43, "Ancient History", "Indus Valley Civilization, Buddhism & Jainism", DayKind::Study),
    DayRecord::new(44, "Full Length Test", "FLT 5, Weekend Upskilling Block", DayKind::FullLengthTest),
    DayRecord::new(45, "Environment", "Protected Areas (National Parks, WLS, Biosphere Reserves)", DayKind::Study),
    DayRecord::new(46, "Sci-Tech", "Biotech (CRISPR, DNA Profiling, Vaccines), Diseases", DayKind::Study),
    DayRecord::new(47, "Ancient History", "Mauryan Empire (Ashoka), Gupta Period (Art/Arch)", DayKind::Study),
    DayRecord::new(48, "Env/Sci Testing", "Mid-Week Test: Environment & Science", DayKind::Test),
    DayRecord::new(49, "Environment", "Climate Change (UNFCCC, Kyoto, Paris), Pollution (AQI, BS-VI)", DayKind::Study),
    DayRecord::new(50, "Sci-Tech", "Defense (Missiles, Subs), Nuclear Tech (3-Stage Program)", DayKind::Study),
    DayRecord::new(51, "Medieval History", "Mughal Architecture/Admin, Vijayanagara Empire", DayKind::Study),
    DayRecord::new(52, "Full Length Test", "FLT 6, Weekend Upskilling Block", DayKind::FullLengthTest),
    DayRecord::new(53, "Environment", "Acts (WPA 1972, EPA 1986, FRA), IUCN Red List Categories", DayKind::Study),
    DayRecord::new(54, "Sci-Tech", "IT & Comm (5G/6G, AI, Blockchain, Quantum)", DayKind::Study),
    DayRecord::new(55, "Polity", "Panchayati Raj & Municipalities (73rd/74th Amd)", DayKind::Study),
    DayRecord::new(56, "CA Testing", "Mid-Week Test: Current Affairs (Last 12 Months)", DayKind::Test),
    DayRecord::new(57, "Environment", "Renewable Energy Targets, Waste Management Rules", DayKind::Study),
    DayRecord::new(58, "Schemes", "Govt Schemes (Agri, Rural Dev, Women)", DayKind::Study),
    DayRecord::new(59, "Buffer", "Catch up on S&T/Env", DayKind::Buffer),
    DayRecord::new(60, "Review Phase 3", "Consolidate S&T and Environment Notes", DayKind::Buffer),
    DayRecord::new(61, "Simulation", "FLT 7 (9:30 AM - 11:30 AM), Detailed Analysis", DayKind::FullLengthTest),
    DayRecord::new(62, "Revision", "Economy Schemes, Budget/Survey Summary", DayKind::Revision),
    DayRecord::new(63, "Revision", "Modern History Timeline, Governor Generals", DayKind::Revision),
    DayRecord::new(64, "Simulation", "FLT 8 (Focus on CSAT if weak)", DayKind::FullLengthTest),
    DayRecord::new(65, "Revision", "Polity Articles, Amendments List", DayKind::Revision),
    DayRecord::new(66, "Revision", "Environment Acts, National Parks Map", DayKind::Revision),
    DayRecord::new(67, "Simulation", "FLT 9 (Open Mock)", DayKind::FullLengthTest),
    DayRecord::new(68, "Revision", "Sci-Tech Emerging Technologies", DayKind::Revision),
    DayRecord::new(69, "Revision", "Mapping (Places in News), IR Revision", DayKind::Revision),
    DayRecord::new(70, "Simulation", "FLT 10 (Final Mock)", DayKind::FullLengthTest),
    DayRecord::new(71, "Relax/Buffer", "Light Reading, Short Notes Only", DayKind::Buffer),
    DayRecord::new(72, "Relax/Buffer", "Light Reading, Short Notes Only", DayKind::Buffer),
    DayRecord::new(73, "Relax/Buffer", "Sleep Cycle Correction", DayKind::Buffer),
    DayRecord::new(74, "Relax/Buffer", "Sleep Cycle Correction", DayKind::Buffer),
    DayRecord::new(75, "THE EXAM", "Go conquer it, Mental Preparation, Final Check", DayKind::Exam),
];

// The table must cover every day 1..=75 in order with a non-empty topic list,
// so every day yields at least one task. Checked at compile time.
const _: () = {
    let mut i = 0;
    while i < PLAN_TABLE.len() {
        assert!(PLAN_TABLE[i].day as usize == i + 1);
        assert!(!PLAN_TABLE[i].topics.is_empty());
        i += 1;
    }
};

/// Splits a comma-joined topic list on commas that are not enclosed in parentheses,
/// trimming whitespace around each topic. Empty fragments are dropped.
pub fn split_topics(topics: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (idx, ch) in topics.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&topics[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&topics[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// The immutable, ordered list of tasks for a plan.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    tasks: Vec<Task>,
    records: Vec<DayRecord>,
    by_day: BTreeMap<u32, Range<usize>>,
}

impl PlanCatalog {
    /// Returns the catalog for the built-in 75-day plan, built once per process.
    pub fn standard() -> &'static PlanCatalog {
        static CATALOG: OnceLock<PlanCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| PlanCatalog::from_records(&PLAN_TABLE))
    }

    /// Expands day records into tasks.
    ///
    /// Records are grouped by day with a stable sort, so tasks keep their source
    /// order within a day. A day listed twice continues its ordinal numbering.
    pub fn from_records(records: &[DayRecord]) -> Self {
        let mut records = records.to_vec();
        records.sort_by_key(|record| record.day);

        let mut tasks = Vec::new();
        let mut ordinals: HashMap<u32, usize> = HashMap::new();
        for record in &records {
            for topic in split_topics(record.topics) {
                let ordinal = ordinals.entry(record.day).or_insert(0);
                *ordinal += 1;
                tasks.push(Task {
                    id: format!("{}-{}", record.day, ordinal),
                    day: record.day,
                    category: record.subject.to_string(),
                    title: topic.to_string(),
                });
            }
        }

        let mut by_day: BTreeMap<u32, Range<usize>> = BTreeMap::new();
        for (idx, task) in tasks.iter().enumerate() {
            by_day
                .entry(task.day)
                .and_modify(|range| range.end = idx + 1)
                .or_insert(idx..idx + 1);
        }

        Self {
            tasks,
            records,
            by_day,
        }
    }

    /// All tasks in catalog order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks scheduled on `day`, in catalog order. Empty for days outside the plan.
    pub fn tasks_for_day(&self, day: u32) -> &[Task] {
        match self.by_day.get(&day) {
            Some(range) => &self.tasks[range.clone()],
            None => &[],
        }
    }

    /// Looks a task up by its `"{day}-{index}"` id.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        let (day, _) = task_id.split_once('-')?;
        let day = day.parse::<u32>().ok()?;
        self.tasks_for_day(day).iter().find(|task| task.id == task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.task(task_id).is_some()
    }

    /// The highest day number that has at least one task.
    pub fn last_day(&self) -> u32 {
        self.by_day.keys().next_back().copied().unwrap_or(0)
    }

    pub fn day_record(&self, day: u32) -> Option<&DayRecord> {
        self.records.iter().find(|record| record.day == day)
    }

    pub fn day_records(&self) -> &[DayRecord] {
        &self.records
    }
}
