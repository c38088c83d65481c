use rocket::{
    response::stream::{Event, EventStream},
    serde::json::Json,
    tokio::{select, sync::broadcast::error::RecvError},
    Route, Shutdown, State,
};

use crate::error::{Error, Result};
use crate::model::{
    address::Address,
    api::funding::{FundingTotal, PledgeRequest, PriceView, Withdrawal},
    auth::AuthToken,
    funding::{EventBus, FundedCandidate, FundingEvent, PriceFeed},
    ledger::Ledger,
};

pub fn routes() -> Vec<Route> {
    routes![
        pledge,
        funded_candidates,
        candidate_funding,
        price,
        update_price,
        withdraw,
        events,
    ]
}

#[post("/funding/pledges", data = "<pledge>", format = "json")]
pub async fn pledge(
    token: AuthToken,
    pledge: Json<PledgeRequest>,
    ledger: &State<Ledger>,
    bus: &State<EventBus>,
) -> Result<Json<FundedCandidate>> {
    let PledgeRequest {
        candidate_address,
        name,
        amount,
    } = pledge.into_inner();

    let funded = ledger
        .transact(|state| {
            Ok(state
                .funding
                .fund(candidate_address, name, amount)?
                .clone())
        })
        .await?;

    info!(
        "{} pledged {amount} wei to {candidate_address}",
        token.address()
    );
    bus.publish(FundingEvent::CandidateFunded {
        candidate: candidate_address,
        eth_amount: amount,
    });
    Ok(Json(funded))
}

#[get("/funding/candidates")]
pub async fn funded_candidates(ledger: &State<Ledger>) -> Json<Vec<FundedCandidate>> {
    Json(ledger.read().await.funding.candidates().to_vec())
}

#[get("/funding/candidates/<address>")]
pub async fn candidate_funding(address: Address, ledger: &State<Ledger>) -> Json<FundingTotal> {
    Json(FundingTotal {
        candidate_address: address,
        funding_amount: ledger.read().await.funding.funding_for(&address),
    })
}

#[get("/funding/price")]
pub async fn price(ledger: &State<Ledger>) -> Result<Json<PriceView>> {
    let price = ledger
        .read()
        .await
        .funding
        .price()
        .ok_or_else(|| Error::not_found("ETH/USD price"))?;
    Ok(Json(price.into()))
}

/// Pull the latest price from the feed and cache it.
#[post("/funding/price")]
pub async fn update_price(
    _token: AuthToken,
    feed: &State<PriceFeed>,
    ledger: &State<Ledger>,
    bus: &State<EventBus>,
) -> Result<Json<PriceView>> {
    let price = feed.latest_price().await?;
    ledger
        .transact(|state| {
            state.funding.set_price(price);
            Ok(())
        })
        .await?;

    info!("ETH/USD price updated to {price}");
    bus.publish(FundingEvent::PriceUpdated {
        eth_usd_price: price,
    });
    Ok(Json(price.into()))
}

/// Pay the unwithdrawn balance out to the admin.
#[post("/funding/withdraw")]
pub async fn withdraw(token: AuthToken, ledger: &State<Ledger>) -> Result<Json<Withdrawal>> {
    let caller = token.address();
    let amount = ledger
        .transact(|state| {
            let admin = *state.registry.admin();
            Ok(state.funding.withdraw(&admin, &caller)?)
        })
        .await?;

    info!("Withdrew {amount} wei");
    Ok(Json(Withdrawal { amount }))
}

/// Funding events as they happen, as server-sent events.
#[get("/funding/events")]
pub fn events(bus: &State<EventBus>, mut end: Shutdown) -> EventStream![] {
    let mut receiver = bus.subscribe();
    EventStream! {
        loop {
            let event = select! {
                received = receiver.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event stream subscriber skipped {skipped} events");
                        continue;
                    }
                },
                _ = &mut end => break,
            };
            yield Event::json(&event).event(event.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
        tokio::{io::AsyncReadExt, time::timeout},
    };

    use crate::model::funding::{Price, Wei};
    use crate::testing::{self, bearer};

    use super::*;

    fn ether(n: u128) -> Wei {
        Wei::new(n * Wei::PER_ETHER)
    }

    async fn refresh_price(client: &Client) {
        let response = client
            .post(uri!(update_price))
            .header(bearer(Address::example(1)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    async fn pledge_from(
        client: &Client,
        backer: u8,
        candidate: u8,
        name: &str,
        amount: Wei,
    ) -> (Status, serde_json::Value) {
        let response = client
            .post(uri!(pledge))
            .header(ContentType::JSON)
            .header(bearer(Address::example(backer)))
            .body(
                json!(PledgeRequest {
                    candidate_address: Address::example(candidate),
                    name: name.to_string(),
                    amount,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json().await.unwrap())
    }

    #[backend_test]
    async fn price_starts_empty(client: Client) {
        let response = client.get(uri!(price)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        // Pledges wait for a price.
        let (status, body) = pledge_from(&client, 1, 2, "Bob", ether(1)).await;
        assert_eq!(Status::Conflict, status);
        assert_eq!(body, json!({ "error": "No ETH/USD price is available yet." }));

        refresh_price(&client).await;
        let response = client.get(uri!(price)).dispatch().await;
        assert_eq!(
            response.into_json::<PriceView>().await.unwrap(),
            PriceView::from(testing::eth_price())
        );
    }

    #[backend_test]
    async fn pledges_accumulate(client: Client) {
        refresh_price(&client).await;

        let (status, body) = pledge_from(&client, 1, 2, "Bob", ether(1)).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(
            body,
            json!({
                "candidateAddress": Address::example(2),
                "name": "Bob",
                "fundingAmount": ether(1).to_string(),
                "dollarAmount": (2000 * Wei::PER_ETHER).to_string(),
            })
        );

        let (status, _) = pledge_from(&client, 3, 2, "", Wei::new(500)).await;
        assert_eq!(Status::Ok, status);
        let (status, _) = pledge_from(&client, 3, 4, "Dee", Wei::new(7)).await;
        assert_eq!(Status::Ok, status);

        let funded: Vec<FundedCandidate> = client
            .get(uri!(funded_candidates))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(funded.len(), 2);
        assert_eq!(funded[0].name, "Bob");
        assert_eq!(funded[0].funding_amount, Wei::new(Wei::PER_ETHER + 500));
        assert_eq!(funded[1].name, "Dee");

        let response = client
            .get(uri!(candidate_funding(Address::example(2))))
            .dispatch()
            .await;
        assert_eq!(
            response.into_json::<FundingTotal>().await.unwrap(),
            FundingTotal {
                candidate_address: Address::example(2),
                funding_amount: Wei::new(Wei::PER_ETHER + 500),
            }
        );

        // Unknown candidates have received nothing.
        let response = client
            .get(uri!(candidate_funding(Address::example(9))))
            .dispatch()
            .await;
        assert_eq!(
            response.into_json::<FundingTotal>().await.unwrap().funding_amount,
            Wei::ZERO
        );
    }

    #[backend_test]
    async fn rejected_pledges(client: Client) {
        refresh_price(&client).await;

        let (status, body) = pledge_from(&client, 1, 2, "Bob", Wei::ZERO).await;
        assert_eq!(Status::UnprocessableEntity, status);
        assert_eq!(body, json!({ "error": "You need to spend more ETH!" }));

        let (status, _) = pledge_from(&client, 1, 2, "", ether(1)).await;
        assert_eq!(Status::UnprocessableEntity, status);

        let response = client
            .post(uri!(pledge))
            .header(ContentType::JSON)
            .body(
                json!({
                    "candidateAddress": Address::example(2),
                    "name": "Bob",
                    "amount": "1",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        let funded: Vec<FundedCandidate> = client
            .get(uri!(funded_candidates))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(funded.is_empty());
    }

    #[backend_test(admin)]
    async fn withdraw_is_admin_only(client: Client) {
        refresh_price(&client).await;
        pledge_from(&client, 1, 2, "Bob", ether(2)).await;

        let response = client
            .post(uri!(withdraw))
            .header(bearer(Address::example(1)))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client.post(uri!(withdraw)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.into_json::<Withdrawal>().await.unwrap().amount,
            ether(2)
        );

        let response = client.post(uri!(withdraw)).dispatch().await;
        assert_eq!(
            response.into_json::<Withdrawal>().await.unwrap().amount,
            Wei::ZERO
        );
    }

    #[backend_test]
    async fn events_are_streamed(client: Client) {
        let mut stream = client.get(uri!(events)).dispatch().await;
        assert_eq!(stream.content_type(), Some(ContentType::EventStream));

        refresh_price(&client).await;

        let mut received = String::new();
        let mut buffer = [0; 512];
        // Heartbeat comments may arrive first; wait for the whole event.
        let complete = |received: &str| {
            received
                .split_once("PriceUpdated")
                .map_or(false, |(_, rest)| rest.contains("\n\n"))
        };
        while !complete(&received) {
            let read = timeout(Duration::from_secs(5), stream.read(&mut buffer))
                .await
                .expect("no event within five seconds")
                .unwrap();
            assert_ne!(read, 0, "event stream ended early");
            received.push_str(std::str::from_utf8(&buffer[..read]).unwrap());
        }

        assert!(received.contains(&Price::from_dollars(2000).unwrap().scaled().to_string()));
    }
}
