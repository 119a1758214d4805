//! GymLedger — membership and billing engine for a fitness business.
//!
//! Ops entry point: seeds a demo roster through the real engine flow and
//! prints the collections, roster, and revenue reports.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use clap::Parser;
use gymledger_billing::{PaymentRecorder, RecordPaymentRequest};
use gymledger_collections::{rank_all, CollectionsClassifier};
use gymledger_core::config::AppConfig;
use gymledger_core::types::PaymentMethod;
use gymledger_directory::{ClientDirectory, RegisterClientRequest};
use gymledger_ledger::{CreatePlanRequest, MembershipLedger, PlanCatalog};
use gymledger_revenue::{ChannelFilter, OrderFeed, OrderStatus, RevenueAggregator};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gymledger")]
#[command(about = "Membership and billing engine for a fitness business")]
#[command(version)]
struct Cli {
    /// Evaluation date for the reports (defaults to today)
    #[arg(long, env = "GYMLEDGER__AS_OF")]
    as_of: Option<NaiveDate>,

    /// Drop collections entries more than this many days overdue
    #[arg(long)]
    max_days_overdue: Option<i64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gymledger=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    let as_of = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());
    info!(as_of = %as_of, "GymLedger starting up");

    // Wire the engine the way a request handler layer would.
    let directory = Arc::new(ClientDirectory::new(&config.directory));
    let plans = Arc::new(PlanCatalog::new());
    let ledger = Arc::new(MembershipLedger::new(plans.clone(), directory.clone()));
    let orders = Arc::new(OrderFeed::new());
    let recorder = PaymentRecorder::new(
        &config.billing,
        ledger.clone(),
        directory.clone(),
        orders.clone(),
    );

    seed_demo_roster(&directory, &plans, &ledger, &recorder, &orders, as_of)?;

    // Collections report.
    let overdue = CollectionsClassifier::list_overdue(
        &directory.all(),
        &ledger.all_periods(),
        &recorder.all(),
        &plans.all(),
        as_of,
        cli.max_days_overdue,
    );
    for entry in &overdue {
        info!(
            client = %entry.name,
            document = %entry.document_id,
            days_overdue = entry.days_overdue,
            plan = entry.plan_name.as_deref().unwrap_or("-"),
            "Overdue"
        );
    }
    info!(count = overdue.len(), "Collections report done");

    // Roster report.
    let roster = rank_all(&directory.all(), &ledger.all_periods(), as_of);
    for ranked in &roster {
        info!(
            client = %ranked.name,
            bucket = ?ranked.bucket,
            latest_end = ?ranked.latest_end,
            "Roster"
        );
    }

    // Month-to-date revenue across both channels.
    let month_start = as_of.with_day(1).unwrap_or(as_of);
    let report = RevenueAggregator::aggregate(
        &recorder.all(),
        &orders.all(),
        month_start,
        as_of,
        ChannelFilter::Both,
    );
    if let Some(combined) = report.combined {
        info!(
            total = combined.total,
            cash = combined.cash,
            transfer = combined.transfer,
            mixed = combined.mixed,
            count = combined.count,
            "Month-to-date revenue"
        );
    }

    Ok(())
}

/// A small roster covering every report bucket: one current member, one
/// advance renewal, one lapsed client, and an online sale.
fn seed_demo_roster(
    directory: &ClientDirectory,
    plans: &PlanCatalog,
    ledger: &MembershipLedger,
    recorder: &PaymentRecorder,
    orders: &OrderFeed,
    as_of: NaiveDate,
) -> anyhow::Result<()> {
    let monthly = plans.create(CreatePlanRequest {
        name: "Monthly".to_string(),
        description: Some("Full gym access, 30 days".to_string()),
        price: 100.0,
        duration_days: 30,
    })?;
    let quarterly = plans.create(CreatePlanRequest {
        name: "Quarterly".to_string(),
        description: None,
        price: 270.0,
        duration_days: 90,
    })?;

    let current = directory.register(RegisterClientRequest {
        document_id: "30111222".to_string(),
        name: "Lucia Fernandez".to_string(),
        phone: "11-5012-3344-5".to_string(),
        email: Some("lucia@example.com".to_string()),
        birth_date: None,
        weight_kg: None,
        medical_notes: None,
    })?;
    let lapsed = directory.register(RegisterClientRequest {
        document_id: "27888999".to_string(),
        name: "Pedro Galvan".to_string(),
        phone: "11-4987-6543-2".to_string(),
        email: None,
        birth_date: None,
        weight_kg: None,
        medical_notes: Some("knee rehab".to_string()),
    })?;

    // Current member pays today and immediately renews in advance.
    for _ in 0..2 {
        let (period, quote) =
            ledger.create_chained_period(current.id, monthly.id, None, None, as_of)?;
        recorder.record(RecordPaymentRequest {
            membership_id: period.id,
            client_id: current.id,
            plan_id: monthly.id,
            amount: monthly.price,
            method: PaymentMethod::Cash,
            payment_date: as_of,
            period_start: quote.start_date,
            period_end: quote.end_date,
            invoice_required: true,
            invoice_number: None,
            notes: None,
        })?;
    }

    // Lapsed member: a quarterly period that ended well before as_of.
    let old_start = as_of - chrono::Duration::days(150);
    let (old_period, old_quote) =
        ledger.create_chained_period(lapsed.id, quarterly.id, Some(old_start), None, old_start)?;
    recorder.record(RecordPaymentRequest {
        membership_id: old_period.id,
        client_id: lapsed.id,
        plan_id: quarterly.id,
        amount: quarterly.price,
        method: PaymentMethod::Transfer,
        payment_date: old_start,
        period_start: old_quote.start_date,
        period_end: old_quote.end_date,
        invoice_required: false,
        invoice_number: None,
        notes: None,
    })?;

    // One approved storefront sale for the online channel.
    orders.record_online(45.0, Some(current.document_id.clone()), OrderStatus::Approved)?;

    info!(
        clients = directory.len(),
        plans = plans.all().len(),
        "Demo roster seeded"
    );
    Ok(())
}
