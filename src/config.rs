use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    address::Address,
    funding::{HttpPriceFeed, PriceFeed, PriceSource},
    ledger::{Ledger, MongoStore},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_address: Address,
    #[serde(default)]
    registration_lead: u32,
    price_feed_url: String,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Account allowed to administer a newly created ledger.
    pub fn admin_address(&self) -> Address {
        self.admin_address
    }

    /// How long before the election starts candidate registration closes.
    pub fn registration_lead(&self) -> Duration {
        Duration::seconds(self.registration_lead.into())
    }

    /// Spot price endpoint for ETH/USD.
    pub fn price_feed_url(&self) -> &str {
        &self.price_feed_url
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match rocket.figment().extract::<Config>() {
            Ok(config) => Ok(rocket.manage(config)),
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                Err(rocket)
            }
        }
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// Name of the MongoDB database holding the ledger.
const DATABASE_NAME: &str = "devote";

/// A fairing that connects to MongoDB, loads (or starts) the ledger stored
/// there and places the [`Ledger`] into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct LedgerFairing;

#[rocket::async_trait]
impl Fairing for LedgerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ledger",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let db_config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let Some(config) = rocket.state::<Config>() else {
            error!("Ledger fairing ran before the application config was loaded");
            return Err(rocket);
        };
        let admin = config.admin_address();
        let registration_lead = config.registration_lead();

        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(db_config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let store = Arc::new(MongoStore::new(&client.database(DATABASE_NAME)));

        let ledger = match Ledger::open(store, admin, registration_lead).await {
            Ok(ledger) => ledger,
            Err(e) => {
                error!("Failed to load ledger: {e}");
                return Err(rocket);
            }
        };
        info!("...ledger online!");

        Ok(rocket.manage(ledger))
    }
}

/// A fairing that places the HTTP price feed into managed state and caches
/// an initial price if the feed is reachable.
///
/// Must be attached after [`LedgerFairing`].
pub struct PriceFeedFairing;

#[rocket::async_trait]
impl Fairing for PriceFeedFairing {
    fn info(&self) -> Info {
        Info {
            name: "Price feed",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Price feed fairing ran before the application config was loaded");
            return Err(rocket);
        };
        let feed = HttpPriceFeed::new(config.price_feed_url());

        // Startup goes ahead without a price; pledges wait for an update.
        match (feed.latest_price().await, rocket.state::<Ledger>()) {
            (Ok(price), Some(ledger)) => {
                let cached = ledger
                    .transact(|state| {
                        state.funding.set_price(price);
                        Ok(())
                    })
                    .await;
                match cached {
                    Ok(()) => info!("Cached initial ETH/USD price {price}"),
                    Err(e) => warn!("Failed to cache initial ETH/USD price: {e}"),
                }
            }
            (Ok(_), None) => warn!("No ledger to cache the initial ETH/USD price in"),
            (Err(e), _) => warn!("Initial ETH/USD price unavailable: {e}"),
        }

        let feed: PriceFeed = Arc::new(feed);
        Ok(rocket.manage(feed))
    }
}
