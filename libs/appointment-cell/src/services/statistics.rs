//! Dashboard and report figures. The aggregation itself is pure; the
//! service wrapper decides which rows to load and with which clock date.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Days, Months, NaiveDate};
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, AppointmentWithPatient};

/// Counts per status over a set of appointments. Every status key is
/// always present, even at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub no_show: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.scheduled + self.confirmed + self.completed + self.cancelled + self.no_show
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPatient {
    pub patient_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub appointment_count: usize,
    pub last_appointment_date: NaiveDate,
}

/// One month of the yearly report. The count covers every appointment in
/// the month; revenue only the completed ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub month: u32,
    pub appointment_count: usize,
    pub revenue: f64,
}

/// One day of the weekly report, same counting rules as [`MonthlyBucket`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub appointment_count: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub today_count: usize,
    pub total_patients: usize,
    pub upcoming: Vec<Appointment>,
    pub counts_by_status: StatusCounts,
    pub monthly_revenue: f64,
    pub no_show_rate: f64,
}

pub fn today_count(appointments: &[Appointment], today: NaiveDate) -> usize {
    appointments.iter().filter(|a| a.date == today).count()
}

/// The next `n` pending appointments: dated today or later, still
/// scheduled or confirmed, in chronological order.
pub fn upcoming(appointments: &[Appointment], today: NaiveDate, n: usize) -> Vec<Appointment> {
    let mut pending: Vec<Appointment> = appointments
        .iter()
        .filter(|a| {
            a.date >= today
                && matches!(
                    a.status,
                    AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
                )
        })
        .cloned()
        .collect();

    pending.sort_by_key(|a| (a.date, a.time));
    pending.truncate(n);
    pending
}

/// Revenue only counts visits that actually happened.
pub fn monthly_revenue(appointments: &[Appointment], year: i32, month: u32) -> f64 {
    appointments
        .iter()
        .filter(|a| {
            a.status == AppointmentStatus::Completed
                && a.date.year() == year
                && a.date.month() == month
        })
        .map(|a| a.price)
        .sum()
}

/// Share of no-shows over `[today - window_days, today)`, as a percentage
/// rounded to two decimals. An empty window yields 0, never NaN.
pub fn no_show_rate(appointments: &[Appointment], today: NaiveDate, window_days: u64) -> f64 {
    let window_start = today - Days::new(window_days);
    let in_window: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.date >= window_start && a.date < today)
        .collect();

    if in_window.is_empty() {
        return 0.0;
    }

    let no_shows = in_window
        .iter()
        .filter(|a| a.status == AppointmentStatus::NoShow)
        .count();

    let rate = no_shows as f64 / in_window.len() as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

fn completed_revenue<'a, I>(appointments: I) -> f64
where
    I: IntoIterator<Item = &'a Appointment>,
{
    appointments
        .into_iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .map(|a| a.price)
        .sum()
}

/// Twelve buckets, January through December, zeros for empty months.
pub fn yearly_breakdown(appointments: &[Appointment], year: i32) -> Vec<MonthlyBucket> {
    (1..=12)
        .map(|month| {
            let in_month: Vec<&Appointment> = appointments
                .iter()
                .filter(|a| a.date.year() == year && a.date.month() == month)
                .collect();

            MonthlyBucket {
                month,
                appointment_count: in_month.len(),
                revenue: completed_revenue(in_month.iter().copied()),
            }
        })
        .collect()
}

/// Seven daily entries for the Monday-to-Sunday week containing `date`.
pub fn weekly_summary(appointments: &[Appointment], date: NaiveDate) -> Vec<DailySummary> {
    let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));

    (0..7)
        .map(|offset| {
            let day = monday + Days::new(offset);
            let on_day: Vec<&Appointment> =
                appointments.iter().filter(|a| a.date == day).collect();

            DailySummary {
                date: day,
                appointment_count: on_day.len(),
                revenue: completed_revenue(on_day.iter().copied()),
            }
        })
        .collect()
}

pub fn counts_by_status(appointments: &[Appointment]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::Scheduled => counts.scheduled += 1,
            AppointmentStatus::Confirmed => counts.confirmed += 1,
            AppointmentStatus::Completed => counts.completed += 1,
            AppointmentStatus::Cancelled => counts.cancelled += 1,
            AppointmentStatus::NoShow => counts.no_show += 1,
        }
    }
    counts
}

/// Patients ranked by visit count, carrying their most recent appointment
/// date. Patients without appointments never appear.
pub fn top_patients(rows: &[AppointmentWithPatient], n: usize) -> Vec<TopPatient> {
    let mut by_patient: HashMap<Uuid, TopPatient> = HashMap::new();

    for row in rows {
        let entry = by_patient
            .entry(row.patient_id)
            .or_insert_with(|| TopPatient {
                patient_id: row.patient_id,
                first_name: row.patient_first_name.clone(),
                last_name: row.patient_last_name.clone(),
                national_id: row.patient_national_id.clone(),
                appointment_count: 0,
                last_appointment_date: row.date,
            });
        entry.appointment_count += 1;
        if row.date > entry.last_appointment_date {
            entry.last_appointment_date = row.date;
        }
    }

    let mut ranked: Vec<TopPatient> = by_patient.into_values().collect();
    ranked.sort_by(|a, b| {
        b.appointment_count
            .cmp(&a.appointment_count)
            .then(b.last_appointment_date.cmp(&a.last_appointment_date))
    });
    ranked.truncate(n);
    ranked
}

pub struct StatisticsService {
    supabase: SupabaseClient,
    clock: Arc<dyn Clock>,
}

impl StatisticsService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            clock,
        }
    }

    async fn load_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await?;
        Ok(appointments)
    }

    pub async fn dashboard(&self, auth_token: &str) -> Result<DashboardStats, AppointmentError> {
        let today = self.clock.today();
        let appointments = self
            .load_appointments("/rest/v1/appointments", auth_token)
            .await?;

        let patients: Vec<serde_json::Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/patients?select=id",
                Some(auth_token),
                None,
            )
            .await?;

        // The dashboard only previews the coming week
        let horizon = today + Days::new(7);
        let upcoming_week: Vec<Appointment> = upcoming(&appointments, today, 5)
            .into_iter()
            .filter(|a| a.date <= horizon)
            .collect();

        Ok(DashboardStats {
            today_count: today_count(&appointments, today),
            total_patients: patients.len(),
            upcoming: upcoming_week,
            counts_by_status: counts_by_status(&appointments),
            monthly_revenue: monthly_revenue(&appointments, today.year(), today.month()),
            no_show_rate: no_show_rate(&appointments, today, 30),
        })
    }

    pub async fn upcoming_appointments(
        &self,
        n: usize,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let today = self.clock.today();
        let path = format!(
            "/rest/v1/appointments?date=gte.{}",
            today.format("%Y-%m-%d")
        );
        let appointments = self.load_appointments(&path, auth_token).await?;

        Ok(upcoming(&appointments, today, n))
    }

    pub async fn revenue_for_month(
        &self,
        year: i32,
        month: u32,
        auth_token: &str,
    ) -> Result<f64, AppointmentError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AppointmentError::Validation(format!("Invalid month: {}-{}", year, month))
        })?;
        let next = first + Months::new(1);

        let path = format!(
            "/rest/v1/appointments?status=eq.completed&date=gte.{}&date=lt.{}",
            first.format("%Y-%m-%d"),
            next.format("%Y-%m-%d")
        );
        let appointments = self.load_appointments(&path, auth_token).await?;

        Ok(monthly_revenue(&appointments, year, month))
    }

    pub async fn no_show_rate_over(
        &self,
        window_days: u64,
        auth_token: &str,
    ) -> Result<f64, AppointmentError> {
        let today = self.clock.today();
        let window_start = today - Days::new(window_days);

        let path = format!(
            "/rest/v1/appointments?date=gte.{}&date=lt.{}",
            window_start.format("%Y-%m-%d"),
            today.format("%Y-%m-%d")
        );
        let appointments = self.load_appointments(&path, auth_token).await?;

        Ok(no_show_rate(&appointments, today, window_days))
    }

    pub async fn yearly_breakdown(
        &self,
        year: i32,
        auth_token: &str,
    ) -> Result<Vec<MonthlyBucket>, AppointmentError> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AppointmentError::Validation(format!("Invalid year: {}", year)))?;
        let next = first + Months::new(12);

        let path = format!(
            "/rest/v1/appointments?date=gte.{}&date=lt.{}",
            first.format("%Y-%m-%d"),
            next.format("%Y-%m-%d")
        );
        let appointments = self.load_appointments(&path, auth_token).await?;

        Ok(yearly_breakdown(&appointments, year))
    }

    /// Weekly report for the week containing `date`, defaulting to the
    /// current week.
    pub async fn weekly_summary(
        &self,
        date: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<DailySummary>, AppointmentError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        let next_monday = monday + Days::new(7);

        let path = format!(
            "/rest/v1/appointments?date=gte.{}&date=lt.{}",
            monday.format("%Y-%m-%d"),
            next_monday.format("%Y-%m-%d")
        );
        let appointments = self.load_appointments(&path, auth_token).await?;

        Ok(weekly_summary(&appointments, date))
    }

    /// Reads the `appointments_with_patient` store view instead of joining
    /// client-side.
    pub async fn top_patients(
        &self,
        n: usize,
        auth_token: &str,
    ) -> Result<Vec<TopPatient>, AppointmentError> {
        let rows: Vec<AppointmentWithPatient> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/appointments_with_patient",
                Some(auth_token),
                None,
            )
            .await?;

        Ok(top_patients(&rows, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use crate::models::ConsultationType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn appointment(date: NaiveDate, time: NaiveTime, status: AppointmentStatus, price: f64) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            date,
            time,
            duration_minutes: 30,
            consultation_type: ConsultationType::FollowUp,
            status,
            notes: None,
            follow_up: None,
            price,
            created_at: None,
        }
    }

    fn view_row(patient_id: Uuid, name: &str, date: NaiveDate) -> AppointmentWithPatient {
        AppointmentWithPatient {
            id: Uuid::new_v4(),
            patient_id,
            date,
            time: t(10, 0),
            duration_minutes: 30,
            status: AppointmentStatus::Completed,
            price: 5000.0,
            patient_first_name: name.to_string(),
            patient_last_name: "García".to_string(),
            patient_national_id: "28456789".to_string(),
        }
    }

    #[test]
    fn test_today_count() {
        let today = d(2024, 1, 8);
        let appointments = vec![
            appointment(today, t(9, 0), AppointmentStatus::Scheduled, 0.0),
            appointment(today, t(10, 0), AppointmentStatus::Cancelled, 0.0),
            appointment(d(2024, 1, 9), t(9, 0), AppointmentStatus::Scheduled, 0.0),
        ];
        assert_eq!(today_count(&appointments, today), 2);
    }

    #[test]
    fn test_upcoming_filters_sorts_and_truncates() {
        let today = d(2024, 1, 8);
        let appointments = vec![
            appointment(d(2024, 1, 10), t(9, 0), AppointmentStatus::Scheduled, 0.0),
            appointment(d(2024, 1, 9), t(15, 0), AppointmentStatus::Confirmed, 0.0),
            appointment(d(2024, 1, 9), t(9, 0), AppointmentStatus::Scheduled, 0.0),
            // Past, cancelled and completed entries never show up
            appointment(d(2024, 1, 7), t(9, 0), AppointmentStatus::Scheduled, 0.0),
            appointment(d(2024, 1, 12), t(9, 0), AppointmentStatus::Cancelled, 0.0),
            appointment(d(2024, 1, 12), t(10, 0), AppointmentStatus::Completed, 0.0),
        ];

        let result = upcoming(&appointments, today, 2);
        assert_eq!(result.len(), 2);
        assert_eq!((result[0].date, result[0].time), (d(2024, 1, 9), t(9, 0)));
        assert_eq!((result[1].date, result[1].time), (d(2024, 1, 9), t(15, 0)));
    }

    #[test]
    fn test_monthly_revenue_counts_completed_only() {
        let appointments = vec![
            appointment(d(2024, 1, 5), t(9, 0), AppointmentStatus::Completed, 5000.0),
            appointment(d(2024, 1, 20), t(9, 0), AppointmentStatus::Completed, 7500.0),
            appointment(d(2024, 1, 21), t(9, 0), AppointmentStatus::Scheduled, 5000.0),
            appointment(d(2024, 1, 22), t(9, 0), AppointmentStatus::NoShow, 5000.0),
            appointment(d(2024, 2, 1), t(9, 0), AppointmentStatus::Completed, 5000.0),
        ];

        assert_eq!(monthly_revenue(&appointments, 2024, 1), 12500.0);
        assert_eq!(monthly_revenue(&appointments, 2024, 3), 0.0);
    }

    #[test]
    fn test_no_show_rate_empty_window_is_zero() {
        let today = d(2024, 1, 8);
        assert_eq!(no_show_rate(&[], today, 30), 0.0);

        // Appointments today or later sit outside the lookback window
        let appointments = vec![appointment(today, t(9, 0), AppointmentStatus::NoShow, 0.0)];
        assert_eq!(no_show_rate(&appointments, today, 30), 0.0);
    }

    #[test]
    fn test_no_show_rate_rounds_to_two_decimals() {
        let today = d(2024, 1, 8);
        let appointments = vec![
            appointment(d(2024, 1, 5), t(9, 0), AppointmentStatus::NoShow, 0.0),
            appointment(d(2024, 1, 5), t(10, 0), AppointmentStatus::Completed, 0.0),
            appointment(d(2024, 1, 6), t(9, 0), AppointmentStatus::Completed, 0.0),
        ];

        // 1 of 3 = 33.333...%
        assert_eq!(no_show_rate(&appointments, today, 30), 33.33);
    }

    #[test]
    fn test_yearly_breakdown_has_twelve_months() {
        let appointments = vec![
            appointment(d(2024, 1, 5), t(9, 0), AppointmentStatus::Completed, 5000.0),
            appointment(d(2024, 1, 20), t(9, 0), AppointmentStatus::Cancelled, 5000.0),
            appointment(d(2024, 3, 2), t(9, 0), AppointmentStatus::Completed, 7500.0),
            // Another year never leaks into the report
            appointment(d(2023, 1, 5), t(9, 0), AppointmentStatus::Completed, 5000.0),
        ];

        let breakdown = yearly_breakdown(&appointments, 2024);
        assert_eq!(breakdown.len(), 12);
        assert_eq!(breakdown[0].month, 1);
        assert_eq!(breakdown[11].month, 12);

        // January counts both rows but only bills the completed one
        assert_eq!(breakdown[0].appointment_count, 2);
        assert_eq!(breakdown[0].revenue, 5000.0);

        assert_eq!(breakdown[2].appointment_count, 1);
        assert_eq!(breakdown[2].revenue, 7500.0);

        assert_eq!(breakdown[1].appointment_count, 0);
        assert_eq!(breakdown[1].revenue, 0.0);
    }

    #[test]
    fn test_weekly_summary_spans_monday_to_sunday() {
        // 2024-01-10 is a Wednesday; its week runs 2024-01-08 to 2024-01-14
        let appointments = vec![
            appointment(d(2024, 1, 8), t(9, 0), AppointmentStatus::Completed, 5000.0),
            appointment(d(2024, 1, 8), t(10, 0), AppointmentStatus::Scheduled, 5000.0),
            appointment(d(2024, 1, 14), t(9, 0), AppointmentStatus::Completed, 7500.0),
            appointment(d(2024, 1, 15), t(9, 0), AppointmentStatus::Completed, 5000.0),
        ];

        let summary = weekly_summary(&appointments, d(2024, 1, 10));
        assert_eq!(summary.len(), 7);
        assert_eq!(summary[0].date, d(2024, 1, 8));
        assert_eq!(summary[6].date, d(2024, 1, 14));

        assert_eq!(summary[0].appointment_count, 2);
        assert_eq!(summary[0].revenue, 5000.0);
        assert_eq!(summary[6].appointment_count, 1);
        assert_eq!(summary[6].revenue, 7500.0);

        // The Monday after the week is out of range
        assert!(summary.iter().all(|day| day.date != d(2024, 1, 15)));
    }

    #[test]
    fn test_weekly_summary_sunday_belongs_to_preceding_week() {
        // 2024-01-14 is a Sunday; the week still starts on 2024-01-08
        let summary = weekly_summary(&[], d(2024, 1, 14));
        assert_eq!(summary[0].date, d(2024, 1, 8));
        assert_eq!(summary[6].date, d(2024, 1, 14));
    }

    #[test]
    fn test_counts_by_status_has_all_keys_and_sums_to_total() {
        let appointments = vec![
            appointment(d(2024, 1, 5), t(9, 0), AppointmentStatus::Scheduled, 0.0),
            appointment(d(2024, 1, 5), t(10, 0), AppointmentStatus::Scheduled, 0.0),
            appointment(d(2024, 1, 6), t(9, 0), AppointmentStatus::NoShow, 0.0),
        ];

        let counts = counts_by_status(&appointments);
        assert_eq!(counts.scheduled, 2);
        assert_eq!(counts.confirmed, 0);
        assert_eq!(counts.completed, 0);
        assert_eq!(counts.cancelled, 0);
        assert_eq!(counts.no_show, 1);
        assert_eq!(counts.total(), appointments.len());

        // Serialized form carries every status key, zeros included
        let json = serde_json::to_value(&counts).unwrap();
        for key in ["scheduled", "confirmed", "completed", "cancelled", "no_show"] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_top_patients_ranking() {
        let frequent = Uuid::new_v4();
        let occasional = Uuid::new_v4();

        let rows = vec![
            view_row(frequent, "Ana", d(2024, 1, 5)),
            view_row(frequent, "Ana", d(2024, 2, 10)),
            view_row(frequent, "Ana", d(2024, 1, 20)),
            view_row(occasional, "Bruno", d(2024, 3, 1)),
        ];

        let ranked = top_patients(&rows, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].patient_id, frequent);
        assert_eq!(ranked[0].appointment_count, 3);
        assert_eq!(ranked[0].last_appointment_date, d(2024, 2, 10));
        assert_eq!(ranked[1].appointment_count, 1);

        let truncated = top_patients(&rows, 1);
        assert_eq!(truncated.len(), 1);
    }
}
