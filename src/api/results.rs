use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    election::reports,
    error::Result,
    model::api::{
        ballot::CandidateDesc,
        results::{CategoryAnalytics, CategoryResults, LiveCategory},
    },
    store::Store,
};

pub fn routes() -> Vec<Route> {
    routes![get_results, get_live_results, get_winners, get_analytics]
}

#[get("/results")]
async fn get_results(store: &State<Store>) -> Result<Json<Vec<CategoryResults>>> {
    Ok(Json(reports::get_results(store.inner().as_ref()).await?))
}

#[get("/results/live")]
async fn get_live_results(store: &State<Store>) -> Result<Json<Vec<LiveCategory>>> {
    Ok(Json(reports::get_live(store.inner().as_ref()).await?))
}

#[get("/winners")]
async fn get_winners(store: &State<Store>) -> Result<Json<Vec<CandidateDesc>>> {
    Ok(Json(
        reports::get_winners(store.inner().as_ref(), Utc::now()).await?,
    ))
}

#[get("/analytics")]
async fn get_analytics(store: &State<Store>) -> Result<Json<Vec<CategoryAnalytics>>> {
    Ok(Json(reports::get_analytics(store.inner().as_ref()).await?))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{
        http::{uri::Origin, Status},
        local::asynchronous::Client,
        serde::json::serde_json::from_str,
    };
    use serde::de::DeserializeOwned;

    use super::*;
    use crate::model::{
        api::id::ApiId,
        db::{NewCandidate, NewCategory, NewVote},
        mongodb::Id,
    };

    async fn get_json<T: DeserializeOwned>(client: &Client, uri: Origin<'static>) -> T {
        let response = client.get(uri).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[backend_test]
    async fn empty_election(client: Client) {
        let results: Vec<CategoryResults> = get_json(&client, uri!(get_results)).await;
        assert!(results.is_empty());
        let winners: Vec<CandidateDesc> = get_json(&client, uri!(get_winners)).await;
        assert!(winners.is_empty());
    }

    #[backend_test]
    async fn public_views_agree(client: Client, store: Store) {
        let category = store
            .insert_category(NewCategory::example_ended())
            .await
            .unwrap();
        let amani = store
            .insert_candidate(NewCandidate::example("Amani", category.id))
            .await
            .unwrap();
        let baraka = store
            .insert_candidate(NewCandidate::example("Baraka", category.id))
            .await
            .unwrap();
        let during = category.window.end().unwrap() - Duration::minutes(1);
        for candidate in [amani.id, amani.id, baraka.id] {
            store
                .insert_vote(NewVote {
                    voter: Id::new(),
                    candidate,
                    category: category.id,
                    cast_at: during,
                })
                .await
                .unwrap();
        }

        let results: Vec<CategoryResults> = get_json(&client, uri!(get_results)).await;
        assert_eq!(results[0].tally[0].candidate, ApiId::from(amani.id));
        assert_eq!(results[0].tally[0].votes, 2);
        assert_eq!(results[0].tally[1].votes, 1);

        let live: Vec<LiveCategory> = get_json(&client, uri!(get_live_results)).await;
        assert_eq!(live[0].leading_candidate, Some(ApiId::from(amani.id)));
        assert!(live[0].tied_candidates.is_empty());

        let winners: Vec<CandidateDesc> = get_json(&client, uri!(get_winners)).await;
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].id, ApiId::from(amani.id));
        assert_eq!(winners[0].full_name, "Amani Mwangi");

        let analytics: Vec<CategoryAnalytics> = get_json(&client, uri!(get_analytics)).await;
        assert_eq!(analytics[0].total_votes, 3);
        let shares: Vec<f64> = analytics[0].candidates.iter().map(|c| c.percentage).collect();
        assert!((shares[0] - 200.0 / 3.0).abs() < 1e-9);
        assert!((shares[1] - 100.0 / 3.0).abs() < 1e-9);
    }
}
