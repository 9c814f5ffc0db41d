use chrono::{FixedOffset, NaiveDateTime, NaiveTime};

/// A time of day at a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTime {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

/// A wall-clock date-time in a named region, such as `Europe/Paris`.
///
/// The zone is carried as its identifier; no zone rules are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonedDateTime {
    pub local: NaiveDateTime,
    pub zone: String,
}

/// A calendar amount, each unit kept separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl Period {
    pub fn new(years: i32, months: i32, days: i32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }
}

/// Conversions between chrono values and their wire fields.
///
/// Every `from_*` returns `None` for fields that name no valid value.
pub(crate) mod wire {
    use chrono::{
        DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike,
        Utc,
    };

    const NANOS_PER_SEC: i64 = 1_000_000_000;
    const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SEC;
    /// Days from 0001-01-01 to 1970-01-01.
    const UNIX_EPOCH_DAY_CE: i64 = 719_163;

    pub fn instant(dt: &DateTime<Utc>) -> (i64, i32) {
        (dt.timestamp(), subsec(dt.timestamp_subsec_nanos()))
    }

    pub fn from_instant(secs: i64, nanos: i32) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
    }

    pub fn date(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    pub fn from_date(millis: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis)
    }

    pub fn local_date(d: &NaiveDate) -> i64 {
        i64::from(d.num_days_from_ce()) - UNIX_EPOCH_DAY_CE
    }

    pub fn from_local_date(epoch_day: i64) -> Option<NaiveDate> {
        let days = i32::try_from(epoch_day.checked_add(UNIX_EPOCH_DAY_CE)?).ok()?;
        NaiveDate::from_num_days_from_ce_opt(days)
    }

    pub fn local_time(t: &NaiveTime) -> i64 {
        i64::from(t.num_seconds_from_midnight()) * NANOS_PER_SEC + i64::from(t.nanosecond())
    }

    pub fn from_local_time(nano_of_day: i64) -> Option<NaiveTime> {
        if !(0..NANOS_PER_DAY).contains(&nano_of_day) {
            return None;
        }
        let secs = u32::try_from(nano_of_day / NANOS_PER_SEC).ok()?;
        let nanos = u32::try_from(nano_of_day % NANOS_PER_SEC).ok()?;
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
    }

    /// The wall clock read as if it were UTC.
    pub fn local_date_time(dt: &NaiveDateTime) -> (i64, i32) {
        instant(&dt.and_utc())
    }

    pub fn from_local_date_time(secs: i64, nanos: i32) -> Option<NaiveDateTime> {
        from_instant(secs, nanos).map(|dt| dt.naive_utc())
    }

    pub fn offset_date_time(dt: &DateTime<FixedOffset>) -> (i64, i32, i32) {
        let (secs, nanos) = local_date_time(&dt.naive_local());
        (secs, nanos, dt.offset().local_minus_utc())
    }

    pub fn from_offset_date_time(
        secs: i64,
        nanos: i32,
        offset: i32,
    ) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(offset)?;
        from_local_date_time(secs, nanos)?
            .and_local_timezone(offset)
            .single()
    }

    pub fn from_offset(offset: i32) -> Option<FixedOffset> {
        FixedOffset::east_opt(offset)
    }

    /// Seconds and nanos with the nanos normalized into `0..1e9`.
    pub fn duration(d: &TimeDelta) -> (i64, i32) {
        let mut secs = d.num_seconds();
        let mut nanos = d.subsec_nanos();
        if nanos < 0 {
            secs -= 1;
            nanos += NANOS_PER_SEC as i32;
        }
        (secs, nanos)
    }

    pub fn from_duration(secs: i64, nanos: i32) -> Option<TimeDelta> {
        TimeDelta::new(secs, u32::try_from(nanos).ok()?)
    }

    fn subsec(nanos: u32) -> i32 {
        // leap-second nanos stay below 2e9
        nanos as i32
    }
}
