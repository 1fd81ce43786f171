//! Demo dataset: a handful of clients, observations, ideas and blotter
//! rows so the CLI has something to rank out of the box.

use chrono::{Days, NaiveDate};

use deskmatch_core::{
    Client, EntityKey, Idea, Observation, ObservationType, PortfolioManager, RawTradeRecord,
};
use deskmatch_storage::MemoryStore;

pub fn seed_demo_data(store: &MemoryStore, now: NaiveDate) {
    store.upsert_client(Client {
        client_id: 1,
        client_name: "Alpha Asset Mgmt".to_string(),
        client_type: "ASSET_MANAGER_LONG_ONLY".to_string(),
        active: true,
    });
    store.upsert_client(Client {
        client_id: 2,
        client_name: "Beta Macro Fund".to_string(),
        client_type: "HF_MACRO".to_string(),
        active: true,
    });
    store.upsert_client(Client {
        client_id: 3,
        client_name: "Gamma Bank Treasury".to_string(),
        client_type: "BANK".to_string(),
        active: true,
    });

    store.upsert_pm(PortfolioManager {
        pm_id: 1,
        client_id: 1,
        pm_name: "J. Keller".to_string(),
        active: true,
    });

    let days_ago = |n: u64| now.checked_sub_days(Days::new(n)).unwrap_or(now);
    let mut add = |entity: EntityKey, obs_type, text: &str, date| {
        store.add_observation(Observation {
            obs_id: 0,
            entity,
            obs_type,
            obs_text: text.to_string(),
            obs_date: date,
            source_confidence: 0.9,
        });
    };

    add(
        EntityKey::client(1),
        ObservationType::TradeNote,
        "Bought 3m EURUSD knockout for hedging EUR receivables",
        days_ago(10),
    );
    add(
        EntityKey::client(1),
        ObservationType::CallNote,
        "Likes KO structures in G10, asked about risk reversals",
        days_ago(25),
    );
    add(
        EntityKey::client(2),
        ObservationType::CallNote,
        "Focused on EM carry, USDBRL and USDZAR NDF positioning",
        days_ago(15),
    );
    add(
        EntityKey::client(2),
        ObservationType::PreferenceNote,
        "Trades around central bank meetings, macro themes",
        days_ago(40),
    );
    add(
        EntityKey::client(3),
        ObservationType::TradeNote,
        "Rolled 1y EURUSD forward hedges",
        days_ago(60),
    );
    add(
        EntityKey::pm(1),
        ObservationType::CallNote,
        "Tracks EURUSD knockout levels, wants G10 hedging ideas",
        days_ago(7),
    );

    store.upsert_idea(Idea {
        idea_id: 1,
        idea_title: "EURUSD 3m KO topside hedge".to_string(),
        idea_text: "Cheap 3m EURUSD knockout for G10 hedgers ahead of the ECB meeting".to_string(),
        created_by: Some("fx-structuring".to_string()),
    });
    store.upsert_idea(Idea {
        idea_id: 2,
        idea_title: "EM carry basket".to_string(),
        idea_text: "USDBRL and USDZAR NDF carry basket for macro accounts".to_string(),
        created_by: Some("em-desk".to_string()),
    });

    store.append_trade_records(vec![
        RawTradeRecord {
            entity: EntityKey::client(1),
            trade_date: days_ago(12).to_string(),
            region: "EUROPE".to_string(),
            country: "DE".to_string(),
            ccy_pair: "EURUSD".to_string(),
            product_type: "KNO".to_string(),
            tenor_bucket: "1M-3M".to_string(),
            notional_m: "25.00M".to_string(),
        },
        RawTradeRecord {
            entity: EntityKey::client(2),
            trade_date: days_ago(20).to_string(),
            region: "CEEMEA".to_string(),
            country: "ZA".to_string(),
            ccy_pair: "USDZAR".to_string(),
            product_type: "NDF".to_string(),
            tenor_bucket: "1M-3M".to_string(),
            notional_m: "10.00M".to_string(),
        },
    ]);
}
