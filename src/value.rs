//! Typed device properties and the refresh-verification state machine.
//!
//! A `Value` is owned by its node's `ValueStore`. Its `ValueType` is fixed by
//! the `ValueId`; only the content and metadata change over time.
//!
//! Refresh verification filters single-sample glitches: a changed sample is
//! parked in `check` and committed only when the next sample confirms it.
//! A sample that disagrees with both is dropped as noise, but two identical
//! noise samples in a row still commit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{config, hex_dump};
use crate::error::ZWaveError;
use crate::value_id::{ValueId, ValueType};

/// Maximum number of switch points a schedule can hold.
pub const MAX_SWITCH_POINTS: usize = 9;
/// Setback code for frost protection mode.
pub const SETBACK_FROST_PROTECTION: i8 = 121;
/// Setback code for energy saving mode.
pub const SETBACK_ENERGY_SAVING: i8 = 122;

/// Equality used by the verification machine.
pub trait Sample: Clone + fmt::Debug {
    fn same_as(&self, other: &Self) -> bool;
}

macro_rules! exact_sample {
    ($($t:ty),*) => {
        $(impl Sample for $t {
            fn same_as(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

exact_sample!(bool, u8, i16, i32, usize, String, Vec<u8>);

/// Fixed-point decimal as reported on the wire, kept as `f64` plus the number
/// of fractional digits the device used.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Decimal {
    pub value: f64,
    pub precision: u8,
}

impl Decimal {
    #[must_use]
    pub const fn new(value: f64, precision: u8) -> Self {
        Self { value, precision }
    }

    /// Half a unit of the finer of the two precisions.
    fn epsilon(a: u8, b: u8) -> f64 {
        let p = i32::from(a.max(b));
        0.5 * 10f64.powi(-p)
    }
}

impl Sample for Decimal {
    fn same_as(&self, other: &Self) -> bool {
        (self.value - other.value).abs() < Self::epsilon(self.precision, other.precision)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", usize::from(self.precision), self.value)
    }
}

impl std::str::FromStr for Decimal {
    type Err = ZWaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value: f64 = s
            .parse()
            .map_err(|e| ZWaveError::Parse(format!("decimal '{s}': {e}")))?;
        if !value.is_finite() {
            return Err(ZWaveError::Parse(format!("decimal '{s}' is not finite")));
        }
        let precision = s
            .split_once('.')
            .map_or(0, |(_, frac)| frac.len().min(7));
        Ok(Self {
            value,
            precision: u8::try_from(precision).unwrap_or(7),
        })
    }
}

/// One entry of a thermostat setback schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPoint {
    pub hours: u8,
    pub minutes: u8,
    /// Tenths of a degree, or one of the `SETBACK_*` mode codes.
    pub setback: i8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    points: Vec<SwitchPoint>,
}

impl Schedule {
    #[must_use]
    pub fn points(&self) -> &[SwitchPoint] {
        &self.points
    }

    /// Insert or update the switch point at `hours:minutes`, keeping time order.
    pub fn set_switch_point(&mut self, hours: u8, minutes: u8, setback: i8) -> Result<(), ZWaveError> {
        if hours > 23 || minutes > 59 {
            return Err(ZWaveError::Parse(format!(
                "switch point time out of range: {hours:02}:{minutes:02}"
            )));
        }
        if setback > SETBACK_ENERGY_SAVING {
            return Err(ZWaveError::Parse(format!("invalid setback: {setback}")));
        }
        if let Some(p) = self
            .points
            .iter_mut()
            .find(|p| p.hours == hours && p.minutes == minutes)
        {
            p.setback = setback;
            return Ok(());
        }
        if self.points.len() >= MAX_SWITCH_POINTS {
            return Err(ZWaveError::Protocol(format!(
                "schedule already holds {MAX_SWITCH_POINTS} switch points"
            )));
        }
        let pos = self
            .points
            .iter()
            .position(|p| (p.hours, p.minutes) > (hours, minutes))
            .unwrap_or(self.points.len());
        self.points.insert(
            pos,
            SwitchPoint {
                hours,
                minutes,
                setback,
            },
        );
        Ok(())
    }

    /// Returns false when no switch point exists at that time.
    pub fn remove_switch_point(&mut self, hours: u8, minutes: u8) -> bool {
        let before = self.points.len();
        self.points
            .retain(|p| !(p.hours == hours && p.minutes == minutes));
        self.points.len() != before
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl Sample for Schedule {
    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("{:02}:{:02}={}", p.hours, p.minutes, p.setback))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Reads the `HH:MM=setback` list written by `Display`.
impl std::str::FromStr for Schedule {
    type Err = ZWaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut schedule = Self::default();
        for part in s.split_whitespace() {
            let bad = || ZWaveError::Parse(format!("switch point '{part}'"));
            let (time, setback) = part.split_once('=').ok_or_else(bad)?;
            let (hours, minutes) = time.split_once(':').ok_or_else(bad)?;
            schedule.set_switch_point(
                hours.parse().map_err(|_| bad())?,
                minutes.parse().map_err(|_| bad())?,
                setback.parse().map_err(|_| bad())?,
            )?;
        }
        Ok(schedule)
    }
}

/// Result of feeding one sample into a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Sample equals the committed value.
    Unchanged,
    /// A changed sample is waiting for confirmation.
    Pending,
    /// Third distinct sample in a row; dropped.
    Noise,
    /// Committed a new value.
    Changed,
}

/// Committed value plus the pending confirmation sample and the last
/// requested target.
#[derive(Clone, Debug)]
pub struct Verified<T> {
    value: T,
    check: Option<T>,
    // last sample dropped as noise
    noise: Option<T>,
    target: Option<T>,
}

impl<T: Sample> Verified<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value,
            check: None,
            noise: None,
            target: None,
        }
    }

    pub const fn get(&self) -> &T {
        &self.value
    }

    pub const fn check(&self) -> Option<&T> {
        self.check.as_ref()
    }

    pub const fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    pub(crate) fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub(crate) fn set_target(&mut self, target: T) {
        self.target = Some(target);
    }

    /// Overwrite the committed value, dropping any pending state.
    pub(crate) fn force(&mut self, value: T) {
        self.value = value;
        self.check = None;
        self.noise = None;
        self.target = None;
    }

    pub fn refresh(&mut self, sample: T, is_set: bool, verify: bool) -> RefreshOutcome {
        let last_noise = self.noise.take();
        if !is_set {
            self.force(sample);
            return RefreshOutcome::Changed;
        }

        // A report echoing what we asked for needs no second opinion.
        if self.target.as_ref().is_some_and(|t| t.same_as(&sample)) {
            self.target = None;
            self.check = None;
            if sample.same_as(&self.value) {
                return RefreshOutcome::Unchanged;
            }
            self.value = sample;
            return RefreshOutcome::Changed;
        }

        if sample.same_as(&self.value) {
            self.check = None;
            return RefreshOutcome::Unchanged;
        }

        if !verify {
            self.value = sample;
            self.check = None;
            return RefreshOutcome::Changed;
        }

        match &self.check {
            Some(check) if check.same_as(&sample) => {
                self.value = sample;
                self.check = None;
                RefreshOutcome::Changed
            }
            // the device settled on a third value
            Some(_) if last_noise.as_ref().is_some_and(|n| n.same_as(&sample)) => {
                self.value = sample;
                self.check = None;
                RefreshOutcome::Changed
            }
            Some(_) => {
                self.noise = Some(sample);
                RefreshOutcome::Noise
            }
            None => {
                self.check = Some(sample);
                RefreshOutcome::Pending
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub label: String,
    pub value: i32,
}

/// Enumerated value: a fixed item list and the selected item's position.
#[derive(Clone, Debug)]
pub struct ListValue {
    items: Vec<ListItem>,
    selection: Verified<usize>,
}

impl ListValue {
    #[must_use]
    pub fn new(items: Vec<ListItem>, default_selection: usize) -> Self {
        Self {
            items,
            selection: Verified::new(default_selection),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ListItem> {
        self.items.get(*self.selection.get())
    }

    fn position_of_value(&self, value: i32) -> Option<usize> {
        self.items.iter().position(|i| i.value == value)
    }

    fn position_of_label(&self, label: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.label.eq_ignore_ascii_case(label))
    }
}

/// Typed content of a value; the variant always matches `ValueId::value_type`.
#[derive(Clone, Debug)]
pub enum ValueContent {
    Bool(Verified<bool>),
    Byte(Verified<u8>),
    Short(Verified<i16>),
    Int(Verified<i32>),
    Decimal(Verified<Decimal>),
    String(Verified<String>),
    List(ListValue),
    Schedule(Verified<Schedule>),
    /// Pressed state. Buttons are write-only and never refreshed.
    Button(bool),
    Raw(Verified<Vec<u8>>),
}

impl ValueContent {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Byte(_) => ValueType::Byte,
            Self::Short(_) => ValueType::Short,
            Self::Int(_) => ValueType::Int,
            Self::Decimal(_) => ValueType::Decimal,
            Self::String(_) => ValueType::String,
            Self::List(_) => ValueType::List,
            Self::Schedule(_) => ValueType::Schedule,
            Self::Button(_) => ValueType::Button,
            Self::Raw(_) => ValueType::Raw,
        }
    }

    /// Zero value for a type; lists start empty.
    #[must_use]
    pub fn default_for(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Self::Bool(Verified::new(false)),
            ValueType::Byte => Self::Byte(Verified::new(0)),
            ValueType::Short => Self::Short(Verified::new(0)),
            ValueType::Int => Self::Int(Verified::new(0)),
            ValueType::Decimal => Self::Decimal(Verified::new(Decimal::default())),
            ValueType::String => Self::String(Verified::new(String::new())),
            ValueType::List => Self::List(ListValue::new(Vec::new(), 0)),
            ValueType::Schedule => Self::Schedule(Verified::new(Schedule::default())),
            ValueType::Button => Self::Button(false),
            ValueType::Raw => Self::Raw(Verified::new(Vec::new())),
        }
    }
}

/// A single decoded sample or requested setting.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueData {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Decimal(Decimal),
    String(String),
    /// Wire value of a list item (not its position).
    List(i32),
    Schedule(Schedule),
    Button(bool),
    Raw(Vec<u8>),
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl ValueData {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Byte(_) => ValueType::Byte,
            Self::Short(_) => ValueType::Short,
            Self::Int(_) => ValueType::Int,
            Self::Decimal(_) => ValueType::Decimal,
            Self::String(_) => ValueType::String,
            Self::List(_) => ValueType::List,
            Self::Schedule(_) => ValueType::Schedule,
            Self::Button(_) => ValueType::Button,
            Self::Raw(_) => ValueType::Raw,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Value {
    id: ValueId,
    label: String,
    units: String,
    read_only: bool,
    write_only: bool,
    poll_intensity: u8,
    verify_changes: bool,
    is_set: bool,
    min: i32,
    max: i32,
    content: ValueContent,
}

impl Value {
    /// Create a value holding the zero content for `id`'s type.
    #[must_use]
    pub fn new(id: ValueId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            units: String::new(),
            read_only: false,
            write_only: id.value_type() == ValueType::Button,
            poll_intensity: 0,
            verify_changes: config().zwave_verify_changes,
            is_set: false,
            min: 0,
            max: 0,
            content: ValueContent::default_for(id.value_type()),
        }
    }

    /// Replace the initial content. Fails when the content type differs from the id's.
    pub fn with_content(mut self, content: ValueContent) -> Result<Self, ZWaveError> {
        if content.value_type() != self.id.value_type() {
            return Err(ZWaveError::TypeMismatch {
                id: self.id,
                expected: self.id.value_type(),
            });
        }
        self.content = content;
        Ok(self)
    }
    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
    #[must_use]
    pub fn with_write_only(mut self, write_only: bool) -> Self {
        self.write_only = write_only;
        self
    }
    #[must_use]
    pub fn with_poll_intensity(mut self, intensity: u8) -> Self {
        self.poll_intensity = intensity;
        self
    }
    #[must_use]
    pub fn with_range(mut self, min: i32, max: i32) -> Self {
        self.min = min;
        self.max = max;
        self
    }
    #[must_use]
    pub fn with_verify_changes(mut self, verify: bool) -> Self {
        self.verify_changes = verify;
        self
    }

    #[must_use]
    pub const fn id(&self) -> ValueId {
        self.id
    }
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
    #[must_use]
    pub fn units(&self) -> &str {
        &self.units
    }
    pub fn set_units(&mut self, units: impl Into<String>) {
        self.units = units.into();
    }
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }
    #[must_use]
    pub const fn is_write_only(&self) -> bool {
        self.write_only
    }
    #[must_use]
    pub const fn poll_intensity(&self) -> u8 {
        self.poll_intensity
    }
    pub fn set_poll_intensity(&mut self, intensity: u8) {
        self.poll_intensity = intensity;
    }
    #[must_use]
    pub const fn verify_changes(&self) -> bool {
        self.verify_changes
    }
    pub fn set_change_verified(&mut self, verify: bool) {
        self.verify_changes = verify;
    }
    /// True once a device report (or a restored state) has supplied content.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.is_set
    }
    #[must_use]
    pub const fn range(&self) -> (i32, i32) {
        (self.min, self.max)
    }
    #[must_use]
    pub const fn content(&self) -> &ValueContent {
        &self.content
    }

    fn mismatch(&self) -> ZWaveError {
        ZWaveError::TypeMismatch {
            id: self.id,
            expected: self.id.value_type(),
        }
    }

    /// Feed a sample decoded from a device report.
    pub fn on_value_refreshed(&mut self, sample: ValueData) -> Result<RefreshOutcome, ZWaveError> {
        let is_set = self.is_set;
        let verify = self.verify_changes;
        let id = self.id;
        let mismatch = self.mismatch();
        let outcome = match (&mut self.content, sample) {
            (ValueContent::Bool(v), ValueData::Bool(s)) => v.refresh(s, is_set, verify),
            (ValueContent::Byte(v), ValueData::Byte(s)) => v.refresh(s, is_set, verify),
            (ValueContent::Short(v), ValueData::Short(s)) => v.refresh(s, is_set, verify),
            (ValueContent::Int(v), ValueData::Int(s)) => v.refresh(s, is_set, verify),
            (ValueContent::Decimal(v), ValueData::Decimal(s)) => v.refresh(s, is_set, verify),
            (ValueContent::String(v), ValueData::String(s)) => v.refresh(s, is_set, verify),
            (ValueContent::Schedule(v), ValueData::Schedule(s)) => v.refresh(s, is_set, verify),
            (ValueContent::Raw(v), ValueData::Raw(s)) => v.refresh(s, is_set, verify),
            (ValueContent::List(l), ValueData::List(item_value)) => {
                let pos = l.position_of_value(item_value).ok_or_else(|| {
                    ZWaveError::Protocol(format!("{id}: no list item with value {item_value}"))
                })?;
                l.selection.refresh(pos, is_set, verify)
            }
            _ => return Err(mismatch),
        };
        self.is_set = true;
        Ok(outcome)
    }

    fn check_range(&self, v: i64) -> Result<(), ZWaveError> {
        if self.min < self.max && (v < i64::from(self.min) || v > i64::from(self.max)) {
            return Err(ZWaveError::OutOfRange {
                id: self.id,
                value: v,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Request a new setting. The committed value stays as is until the
    /// device reports it back; the request is remembered as the target.
    pub fn set(&mut self, data: ValueData) -> Result<(), ZWaveError> {
        if self.read_only {
            return Err(ZWaveError::ReadOnly(self.id));
        }
        match &data {
            ValueData::Byte(v) => self.check_range(i64::from(*v))?,
            ValueData::Short(v) => self.check_range(i64::from(*v))?,
            ValueData::Int(v) => self.check_range(i64::from(*v))?,
            _ => {}
        }
        let id = self.id;
        let mismatch = self.mismatch();
        match (&mut self.content, data) {
            (ValueContent::Bool(v), ValueData::Bool(s)) => v.set_target(s),
            (ValueContent::Byte(v), ValueData::Byte(s)) => v.set_target(s),
            (ValueContent::Short(v), ValueData::Short(s)) => v.set_target(s),
            (ValueContent::Int(v), ValueData::Int(s)) => v.set_target(s),
            (ValueContent::Decimal(v), ValueData::Decimal(s)) => v.set_target(s),
            (ValueContent::String(v), ValueData::String(s)) => v.set_target(s),
            (ValueContent::Schedule(v), ValueData::Schedule(s)) => v.set_target(s),
            (ValueContent::Raw(v), ValueData::Raw(s)) => v.set_target(s),
            (ValueContent::Button(pressed), ValueData::Button(s)) => *pressed = s,
            (ValueContent::List(l), ValueData::List(item_value)) => {
                let pos = l.position_of_value(item_value).ok_or_else(|| {
                    ZWaveError::Parse(format!("{id}: no list item with value {item_value}"))
                })?;
                l.selection.set_target(pos);
            }
            _ => return Err(mismatch),
        }
        Ok(())
    }

    pub fn press_button(&mut self) -> Result<(), ZWaveError> {
        self.set(ValueData::Button(true))
    }

    pub fn release_button(&mut self) -> Result<(), ZWaveError> {
        self.set(ValueData::Button(false))
    }

    /// Text form of the committed content.
    #[must_use]
    pub fn get_as_string(&self) -> String {
        match &self.content {
            ValueContent::Bool(v) => bool_text(*v.get()),
            ValueContent::Byte(v) => v.get().to_string(),
            ValueContent::Short(v) => v.get().to_string(),
            ValueContent::Int(v) => v.get().to_string(),
            ValueContent::Decimal(v) => v.get().to_string(),
            ValueContent::String(v) => v.get().clone(),
            ValueContent::List(l) => l.selected().map(|i| i.label.clone()).unwrap_or_default(),
            ValueContent::Schedule(v) => v.get().to_string(),
            ValueContent::Button(p) => bool_text(*p),
            ValueContent::Raw(v) => hex_dump(v.get()),
        }
    }

    /// Parse `s` according to this value's type into a sample.
    pub fn parse_data(&self, s: &str) -> Result<ValueData, ZWaveError> {
        let t = s.trim();
        let bad = |what: &str| ZWaveError::Parse(format!("'{s}' is not a valid {what}"));
        Ok(match &self.content {
            ValueContent::Bool(_) | ValueContent::Button(_) => {
                let b = if t.eq_ignore_ascii_case("true") {
                    true
                } else if t.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return Err(bad("bool"));
                };
                if matches!(self.content, ValueContent::Button(_)) {
                    ValueData::Button(b)
                } else {
                    ValueData::Bool(b)
                }
            }
            ValueContent::Byte(_) => ValueData::Byte(t.parse().map_err(|_| bad("byte"))?),
            ValueContent::Short(_) => ValueData::Short(t.parse().map_err(|_| bad("short"))?),
            ValueContent::Int(_) => ValueData::Int(t.parse().map_err(|_| bad("int"))?),
            ValueContent::Decimal(_) => ValueData::Decimal(t.parse()?),
            ValueContent::String(_) => ValueData::String(s.to_string()),
            ValueContent::List(l) => {
                let pos = l.position_of_label(t).ok_or_else(|| bad("list item"))?;
                ValueData::List(l.items[pos].value)
            }
            ValueContent::Raw(_) => ValueData::Raw(parse_hex_bytes(t).ok_or_else(|| bad("hex byte string"))?),
            ValueContent::Schedule(_) => {
                return Err(ZWaveError::Parse(
                    "schedules are edited through switch points".into(),
                ))
            }
        })
    }

    /// Parse and `set`. Nothing changes when parsing fails.
    pub fn set_from_string(&mut self, s: &str) -> Result<(), ZWaveError> {
        let data = self.parse_data(s)?;
        self.set(data)
    }

    /// Load committed content from text, bypassing read-only and verification.
    pub(crate) fn restore_from_string(&mut self, s: &str) -> Result<(), ZWaveError> {
        let data = match self.content {
            ValueContent::Schedule(_) => ValueData::Schedule(s.parse()?),
            _ => self.parse_data(s)?,
        };
        self.force_data(data).map(|_| ())
    }

    /// Put back content taken from `content()` of this same value.
    pub(crate) fn restore_content(&mut self, content: ValueContent) {
        self.content = content;
    }

    /// Commit `data` as is, dropping pending state. Returns true when the
    /// committed content changed.
    pub(crate) fn force_data(&mut self, data: ValueData) -> Result<bool, ZWaveError> {
        let before = self.get_as_string();
        let mismatch = self.mismatch();
        match (&mut self.content, data) {
            (ValueContent::Bool(v), ValueData::Bool(d)) => v.force(d),
            (ValueContent::Byte(v), ValueData::Byte(d)) => v.force(d),
            (ValueContent::Short(v), ValueData::Short(d)) => v.force(d),
            (ValueContent::Int(v), ValueData::Int(d)) => v.force(d),
            (ValueContent::Decimal(v), ValueData::Decimal(d)) => v.force(d),
            (ValueContent::String(v), ValueData::String(d)) => v.force(d),
            (ValueContent::Raw(v), ValueData::Raw(d)) => v.force(d),
            (ValueContent::Schedule(v), ValueData::Schedule(d)) => v.force(d),
            (ValueContent::Button(p), ValueData::Button(d)) => *p = d,
            (ValueContent::List(l), ValueData::List(item_value)) => {
                if let Some(pos) = l.position_of_value(item_value) {
                    l.selection.force(pos);
                }
            }
            _ => return Err(mismatch),
        }
        let was_set = std::mem::replace(&mut self.is_set, true);
        Ok(!was_set || self.get_as_string() != before)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match &self.content {
            ValueContent::Bool(v) => Some(*v.get()),
            ValueContent::Button(p) => Some(*p),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_byte(&self) -> Option<u8> {
        match &self.content {
            ValueContent::Byte(v) => Some(*v.get()),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_short(&self) -> Option<i16> {
        match &self.content {
            ValueContent::Short(v) => Some(*v.get()),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match &self.content {
            ValueContent::Int(v) => Some(*v.get()),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match &self.content {
            ValueContent::Decimal(v) => Some(*v.get()),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.content {
            ValueContent::String(v) => Some(v.get().as_str()),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_raw(&self) -> Option<&[u8]> {
        match &self.content {
            ValueContent::Raw(v) => Some(v.get().as_slice()),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_list(&self) -> Option<&ListValue> {
        match &self.content {
            ValueContent::List(l) => Some(l),
            _ => None,
        }
    }
    #[must_use]
    pub fn as_schedule(&self) -> Option<&Schedule> {
        match &self.content {
            ValueContent::Schedule(v) => Some(v.get()),
            _ => None,
        }
    }

    fn schedule_mut(&mut self) -> Result<&mut Schedule, ZWaveError> {
        if self.read_only {
            return Err(ZWaveError::ReadOnly(self.id));
        }
        let id = self.id;
        match &mut self.content {
            ValueContent::Schedule(v) => Ok(v.value_mut()),
            _ => Err(ZWaveError::TypeMismatch {
                id,
                expected: ValueType::Schedule,
            }),
        }
    }

    /// Edits the local copy only; the schedule is sent as a whole afterwards.
    pub fn set_switch_point(&mut self, hours: u8, minutes: u8, setback: i8) -> Result<(), ZWaveError> {
        self.schedule_mut()?.set_switch_point(hours, minutes, setback)
    }

    pub fn remove_switch_point(&mut self, hours: u8, minutes: u8) -> Result<(), ZWaveError> {
        if self.schedule_mut()?.remove_switch_point(hours, minutes) {
            Ok(())
        } else {
            Err(ZWaveError::Protocol(format!(
                "no switch point at {hours:02}:{minutes:02}"
            )))
        }
    }

    pub fn clear_switch_points(&mut self) -> Result<(), ZWaveError> {
        self.schedule_mut()?.clear();
        Ok(())
    }

    #[must_use]
    pub fn num_switch_points(&self) -> usize {
        self.as_schedule().map_or(0, |s| s.points().len())
    }

    #[must_use]
    pub fn switch_point(&self, idx: usize) -> Option<SwitchPoint> {
        self.as_schedule().and_then(|s| s.points().get(idx).copied())
    }

    /// Pending confirmation sample as text, for diagnostics.
    #[must_use]
    pub fn pending_check(&self) -> Option<String> {
        match &self.content {
            ValueContent::Bool(v) => v.check().map(ToString::to_string),
            ValueContent::Byte(v) => v.check().map(ToString::to_string),
            ValueContent::Short(v) => v.check().map(ToString::to_string),
            ValueContent::Int(v) => v.check().map(ToString::to_string),
            ValueContent::Decimal(v) => v.check().map(ToString::to_string),
            ValueContent::String(v) => v.check().cloned(),
            ValueContent::List(l) => l
                .selection
                .check()
                .and_then(|p| l.items.get(*p))
                .map(|i| i.label.clone()),
            ValueContent::Schedule(v) => v.check().map(ToString::to_string),
            ValueContent::Raw(v) => v.check().map(|b| hex_dump(b)),
            ValueContent::Button(_) => None,
        }
    }
}

fn bool_text(b: bool) -> String {
    let text = if b { "True" } else { "False" };
    text.to_string()
}

fn parse_hex_bytes(s: &str) -> Option<Vec<u8>> {
    let compact: String = s.split_whitespace().collect();
    let compact = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    if compact.len() % 2 != 0 {
        return None;
    }
    (0..compact.len())
        .step_by(2)
        .map(|i| compact.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
        .collect()
}
