use chrono::Utc;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    election::{cast_vote, reports, CastOutcome},
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            ballot::{BallotCategory, VoteRequest},
        },
        db::Voter,
    },
    store::Store,
};

pub fn routes() -> Vec<Route> {
    routes![get_ballot, submit_vote]
}

#[get("/ballot")]
async fn get_ballot(
    token: AuthToken<Voter>,
    store: &State<Store>,
) -> Result<Json<Vec<BallotCategory>>> {
    let ballot = reports::get_ballot(store.inner().as_ref(), token.id, Utc::now()).await?;
    Ok(Json(ballot))
}

#[post("/vote", data = "<vote>", format = "json")]
async fn submit_vote(
    token: AuthToken<Voter>,
    vote: Json<VoteRequest>,
    store: &State<Store>,
) -> Result<()> {
    let Some(candidate) = vote.candidate.as_deref() else {
        return Err(Error::bad_request("Please select a candidate"));
    };

    let outcome = cast_vote(
        store.inner().as_ref(),
        token.id,
        &vote.category,
        candidate,
        Utc::now(),
    )
    .await?;

    match outcome {
        CastOutcome::Ok => Ok(()),
        CastOutcome::AlreadyVoted => Err(Error::Status(
            Status::Conflict,
            "You have already voted in this category".to_string(),
        )),
        CastOutcome::UnknownCandidate => Err(Error::not_found(format!("Candidate '{candidate}'"))),
        CastOutcome::UnknownCategory => {
            Err(Error::not_found(format!("Category '{}'", vote.category)))
        }
        CastOutcome::CategoryClosed => Err(Error::Status(
            Status::Forbidden,
            "Voting is not open for this category".to_string(),
        )),
    }
}
