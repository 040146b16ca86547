//! Database seeder for Prexo development and testing.
//!
//! Seeds a default commission scheme, baseline commission rules, and demo
//! wallets for local development. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use prexo_core::commission::{RateType, RuleScope};
use prexo_core::error::EngineError;
use prexo_core::lifecycle::TransactionKind;
use prexo_db::repositories::CreateRuleInput;
use prexo_db::{CommissionRepository, WalletRepository};
use prexo_shared::types::OwnerId;

/// Demo owner IDs (consistent for all seeds).
const DEMO_OWNER_IDS: &[&str] = &[
    "00000000-0000-0000-0000-000000000001",
    "00000000-0000-0000-0000-000000000002",
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = prexo_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let commissions = CommissionRepository::new(db.clone());
    let wallets = WalletRepository::new(db.clone());

    println!("Seeding default commission scheme...");
    let scheme_id = seed_default_scheme(&commissions).await;

    println!("Seeding commission rules...");
    seed_rules(&commissions, scheme_id).await;

    println!("Seeding demo wallets...");
    seed_wallets(&wallets).await;

    println!("Seeding complete!");
}

/// Ensures a default scheme exists and returns its id.
async fn seed_default_scheme(
    commissions: &CommissionRepository,
) -> Option<prexo_shared::types::SchemeId> {
    match commissions.list_schemes().await {
        Ok(schemes) => {
            if let Some(existing) = schemes.iter().find(|s| s.is_default) {
                println!("  Default scheme already exists, skipping...");
                return Some(existing.id);
            }
        }
        Err(e) => {
            eprintln!("Failed to list schemes: {e}");
            return None;
        }
    }

    match commissions
        .create_scheme("Standard Retailer".to_string(), true)
        .await
    {
        Ok(scheme) => {
            println!("  Created default scheme: {}", scheme.name);
            Some(scheme.id)
        }
        Err(e) => {
            eprintln!("Failed to create default scheme: {e}");
            None
        }
    }
}

/// Seeds a baseline rule set: global percentages plus one scheme override.
async fn seed_rules(
    commissions: &CommissionRepository,
    scheme_id: Option<prexo_shared::types::SchemeId>,
) {
    let global = |kind, operator: &str, value: Decimal| CreateRuleInput {
        scope: RuleScope::Global,
        operator: operator.to_string(),
        kind,
        rate_type: RateType::Percentage,
        value,
        min_fee: Decimal::ZERO,
        max_fee: None,
    };

    let mut rules = vec![
        global(TransactionKind::MobileRecharge, "airtel", dec!(2.5)),
        global(TransactionKind::MobileRecharge, "vodafone", dec!(2.0)),
        global(TransactionKind::DthRecharge, "tatasky", dec!(3.0)),
        global(TransactionKind::BillPayment, "mseb", dec!(1.0)),
    ];

    if let Some(scheme_id) = scheme_id {
        rules.push(CreateRuleInput {
            scope: RuleScope::Scheme { scheme_id },
            operator: "airtel".to_string(),
            kind: TransactionKind::MobileRecharge,
            rate_type: RateType::Percentage,
            value: dec!(3.0),
            min_fee: dec!(1),
            max_fee: Some(dec!(50)),
        });
    }

    for input in rules {
        let label = format!("{} / {}", input.operator, input.kind.as_str());
        match commissions.create_rule(input).await {
            Ok(_) => println!("  Created rule: {label}"),
            Err(EngineError::DuplicateRule) => {
                println!("  Rule already exists, skipping: {label}");
            }
            Err(e) => eprintln!("Failed to create rule {label}: {e}"),
        }
    }
}

/// Seeds zero-balance demo wallets.
async fn seed_wallets(wallets: &WalletRepository) {
    for raw in DEMO_OWNER_IDS {
        let owner_id = OwnerId::from_uuid(Uuid::parse_str(raw).expect("valid demo uuid"));
        match wallets.create(owner_id).await {
            Ok(wallet) => println!("  Created wallet {} for owner {owner_id}", wallet.id),
            Err(EngineError::DuplicateWallet(_)) => {
                println!("  Wallet already exists for owner {owner_id}, skipping...");
            }
            Err(e) => eprintln!("Failed to create wallet for {owner_id}: {e}"),
        }
    }
}
