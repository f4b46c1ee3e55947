//! # Dashboard Statistics
//!
//! Summaries over the invoice history for a year, a month, or a custom
//! date range.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  filter ──► split active / cancelled ──► counts, sums, recent five     │
//! │                                                                         │
//! │  • sales and VAT totals count ACTIVE invoices only                      │
//! │  • "today" counts active invoices dated today                           │
//! │  • recent = first five active invoices in store order (newest first)   │
//! │  • monthly chart always covers the whole selected year                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::format::parse_iso_date;
use crate::money::Money;
use crate::types::Invoice;

/// How many active invoices the "recent" panel shows.
pub const RECENT_LIMIT: usize = 5;

/// Which invoices the dashboard looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardFilter {
    /// A calendar year, optionally narrowed to one month (1-12).
    Year { year: i32, month: Option<u32> },
    /// Inclusive `YYYY-MM-DD` range, compared lexically.
    Range { from: String, to: String },
}

impl DashboardFilter {
    /// The current month of `today`.
    pub fn current_month(today: NaiveDate) -> Self {
        DashboardFilter::Year {
            year: today.year(),
            month: Some(today.month()),
        }
    }

    /// Returns true if the invoice's date falls inside the filter.
    pub fn matches(&self, invoice: &Invoice) -> bool {
        match self {
            DashboardFilter::Range { from, to } => {
                invoice.date.as_str() >= from.as_str() && invoice.date.as_str() <= to.as_str()
            }
            DashboardFilter::Year { year, month } => match parse_iso_date(&invoice.date) {
                Ok(date) => date.year() == *year && month.map_or(true, |m| date.month() == m),
                Err(_) => false,
            },
        }
    }

    /// Year used for the monthly chart.
    pub fn chart_year(&self, today: NaiveDate) -> i32 {
        match self {
            DashboardFilter::Year { year, .. } => *year,
            DashboardFilter::Range { from, .. } => parse_iso_date(from)
                .map(|d| d.year())
                .unwrap_or_else(|_| today.year()),
        }
    }
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_invoices: usize,
    pub active_invoices: usize,
    pub cancelled_invoices: usize,
    pub total_sales: Money,
    pub total_vat: Money,
    pub cancelled_total: Money,
    pub today_invoices: usize,
    pub total_customers: usize,
    pub recent: Vec<Invoice>,
    /// Active sales per month of the chart year, January first.
    pub monthly_sales: [Money; 12],
}

impl DashboardStats {
    /// Computes the dashboard over `invoices` given in store order.
    pub fn compute(
        invoices: &[Invoice],
        customer_count: usize,
        filter: &DashboardFilter,
        today: NaiveDate,
    ) -> Self {
        let today_str = today.format("%Y-%m-%d").to_string();
        let (cancelled, active): (Vec<&Invoice>, Vec<&Invoice>) = invoices
            .iter()
            .filter(|inv| filter.matches(inv))
            .partition(|inv| inv.is_cancelled());

        DashboardStats {
            total_invoices: active.len() + cancelled.len(),
            active_invoices: active.len(),
            cancelled_invoices: cancelled.len(),
            total_sales: active.iter().map(|inv| inv.total).sum(),
            total_vat: active.iter().map(|inv| inv.vat).sum(),
            cancelled_total: cancelled.iter().map(|inv| inv.total).sum(),
            today_invoices: active.iter().filter(|inv| inv.date == today_str).count(),
            total_customers: customer_count,
            recent: active.iter().take(RECENT_LIMIT).map(|inv| (*inv).clone()).collect(),
            monthly_sales: monthly_sales(invoices, filter.chart_year(today)),
        }
    }
}

/// Active sales per month of `year`.
pub fn monthly_sales(invoices: &[Invoice], year: i32) -> [Money; 12] {
    let mut months = [Money::zero(); 12];
    for invoice in invoices.iter().filter(|inv| !inv.is_cancelled()) {
        if let Ok(date) = parse_iso_date(&invoice.date) {
            if date.year() == year {
                months[date.month0() as usize] += invoice.total;
            }
        }
    }
    months
}
