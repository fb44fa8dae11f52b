use chrono::Utc;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{ActiveSpec, CandidateSpec, CategoryDesc, CategorySpec, WindowSpec},
            auth::AuthToken,
            ballot::CandidateDesc,
            results::VoteDesc,
        },
        common::VotingWindow,
        db::{Admin, Candidate, NewCandidate, NewCategory},
        mongodb::Id,
    },
    store::{ElectionStore, Store},
};

pub fn routes() -> Vec<Route> {
    routes![
        get_categories,
        create_category,
        set_category_window,
        create_candidate,
        modify_candidate,
        set_voter_active,
        get_votes,
    ]
}

/// Fail with 404 unless the category exists.
async fn ensure_category_exists(store: &dyn ElectionStore, id: Id) -> Result<()> {
    match store.category(id).await? {
        Some(_) => Ok(()),
        None => Err(Error::not_found(format!("Category {id}"))),
    }
}

#[get("/admin/categories")]
async fn get_categories(
    _token: AuthToken<Admin>,
    store: &State<Store>,
) -> Result<Json<Vec<CategoryDesc>>> {
    let now = Utc::now();
    let categories = store
        .categories()
        .await?
        .into_iter()
        .map(|category| CategoryDesc::new(category, now))
        .collect();
    Ok(Json(categories))
}

#[post("/admin/categories", data = "<spec>", format = "json")]
async fn create_category(
    _token: AuthToken<Admin>,
    spec: Json<CategorySpec>,
    store: &State<Store>,
) -> Result<Json<CategoryDesc>> {
    let spec = spec.0;
    if spec.name.trim().is_empty() {
        return Err(Error::bad_request("Category name must not be empty"));
    }
    let category = NewCategory {
        window: spec.window.try_into()?,
        name: spec.name.trim().to_string(),
    };

    let category = match store.insert_category(category).await {
        Ok(category) => category,
        Err(Error::Duplicate(_)) => {
            return Err(Error::Status(
                Status::Conflict,
                format!("Category name already in use: {}", spec.name.trim()),
            ))
        }
        Err(e) => return Err(e),
    };
    info!("Created category {}", category.name);
    Ok(Json(CategoryDesc::new(category, Utc::now())))
}

#[put("/admin/categories/<category_id>/window", data = "<spec>", format = "json")]
async fn set_category_window(
    _token: AuthToken<Admin>,
    category_id: Id,
    spec: Json<WindowSpec>,
    store: &State<Store>,
) -> Result<Json<CategoryDesc>> {
    let window: VotingWindow = spec.0.try_into()?;
    if !store.set_category_window(category_id, window).await? {
        return Err(Error::not_found(format!("Category {category_id}")));
    }
    let category = store
        .category(category_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Category {category_id}")))?;
    info!("Set voting window of category {}", category.name);
    Ok(Json(CategoryDesc::new(category, Utc::now())))
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    store: &State<Store>,
) -> Result<Json<CandidateDesc>> {
    let candidate: NewCandidate = spec.0.into();
    ensure_category_exists(store.inner().as_ref(), candidate.category).await?;

    let candidate = store.insert_candidate(candidate).await?;
    info!("Created candidate {}", candidate.full_name());
    Ok(Json(candidate.into()))
}

#[put("/admin/candidates/<candidate_id>", data = "<spec>", format = "json")]
async fn modify_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    spec: Json<CandidateSpec>,
    store: &State<Store>,
) -> Result<Json<CandidateDesc>> {
    let candidate = Candidate {
        id: candidate_id,
        candidate: spec.0.into(),
    };
    let existing = store
        .candidate(candidate_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
    ensure_category_exists(store.inner().as_ref(), candidate.category).await?;

    // Votes copy their candidate's category, so a candidate with votes stays put.
    if existing.category != candidate.category
        && store
            .vote_counts(existing.category)
            .await?
            .contains_key(&candidate_id)
    {
        return Err(Error::Status(
            Status::Conflict,
            format!(
                "Candidate {} already has votes and cannot change category",
                existing.full_name()
            ),
        ));
    }

    if !store.replace_candidate(&candidate).await? {
        return Err(Error::not_found(format!("Candidate {candidate_id}")));
    }
    info!("Updated candidate {}", candidate.full_name());
    Ok(Json(candidate.into()))
}

#[put("/admin/voters/<voter_id>/active", data = "<spec>", format = "json")]
async fn set_voter_active(
    _token: AuthToken<Admin>,
    voter_id: &str,
    spec: Json<ActiveSpec>,
    store: &State<Store>,
) -> Result<()> {
    if !store.set_voter_active(voter_id, spec.active).await? {
        return Err(Error::not_found(format!("Voter {voter_id}")));
    }
    info!(
        "Voter {voter_id} is now {}",
        if spec.active { "active" } else { "inactive" }
    );
    Ok(())
}

#[get("/admin/votes")]
async fn get_votes(_token: AuthToken<Admin>, store: &State<Store>) -> Result<Json<Vec<VoteDesc>>> {
    let votes = store
        .votes()
        .await?
        .into_iter()
        .map(VoteDesc::from)
        .collect();
    Ok(Json(votes))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{from_str, json},
    };

    use super::*;
    use crate::{
        election::{cast_vote, CastOutcome},
        model::{
            api::id::ApiId,
            common::VotingStatus,
            db::{NewVote, NewVoter},
        },
    };

    async fn post_category(client: &Client, spec: &CategorySpec) -> (Status, Option<CategoryDesc>) {
        let response = client
            .post(uri!(create_category))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        let status = response.status();
        let body = response.into_string().await.unwrap();
        (status, from_str(&body).ok())
    }

    #[backend_test(admin)]
    async fn create_and_list_categories(client: Client) {
        let (status, created) = post_category(&client, &CategorySpec::example()).await;
        assert_eq!(Status::Ok, status);
        let created = created.unwrap();
        assert_eq!(created.status, VotingStatus::Ongoing);

        let (status, _) = post_category(&client, &CategorySpec::example()).await;
        assert_eq!(Status::Conflict, status);

        let response = client.get(uri!(get_categories)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<CategoryDesc> = from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[backend_test(admin)]
    async fn window_must_be_ordered(client: Client, store: Store) {
        let now = Utc::now();
        let mut spec = CategorySpec::example();
        spec.window = WindowSpec {
            start: Some(now),
            end: Some(now - Duration::hours(1)),
        };
        let (status, _) = post_category(&client, &spec).await;
        assert_eq!(Status::BadRequest, status);

        let category = store
            .insert_category(NewCategory::example_open())
            .await
            .unwrap();
        let response = client
            .put(uri!(set_category_window(category.id)))
            .header(ContentType::JSON)
            .body(json!(WindowSpec { start: None, end: Some(now - Duration::minutes(1)) }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let desc: CategoryDesc = from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(desc.status, VotingStatus::Ended);

        let stored = store.category(category.id).await.unwrap().unwrap();
        assert!(!stored.window.is_open(Utc::now()));
    }

    #[backend_test(admin)]
    async fn candidates_need_a_category(client: Client, store: Store) {
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(CandidateSpec::example("Amani", Id::new())).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let category = store
            .insert_category(NewCategory::example_open())
            .await
            .unwrap();
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(json!(CandidateSpec::example("Amani", category.id)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let created: CandidateDesc = from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(created.category, ApiId::from(category.id));

        let mut spec = CandidateSpec::example("Amani", category.id);
        spec.middle_name = Some("Wairimu".to_string());
        let response = client
            .put(uri!(modify_candidate(*created.id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let stored = store.candidate(*created.id).await.unwrap().unwrap();
        assert_eq!(stored.full_name(), "Amani Wairimu Achieng");

        let response = client
            .put(uri!(modify_candidate(Id::new())))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidate_with_votes_keeps_category(client: Client, store: Store) {
        let president = store
            .insert_category(NewCategory::example_open())
            .await
            .unwrap();
        let mut treasurer = NewCategory::example_open();
        treasurer.name = "Treasurer".to_string();
        let treasurer = store.insert_category(treasurer).await.unwrap();
        let amani = store
            .insert_candidate(NewCandidate::example("Amani", president.id))
            .await
            .unwrap();
        let baraka = store
            .insert_candidate(NewCandidate::example("Baraka", president.id))
            .await
            .unwrap();
        let voter = Id::new();
        store
            .insert_vote(NewVote {
                voter,
                candidate: amani.id,
                category: president.id,
                cast_at: Utc::now(),
            })
            .await
            .unwrap();

        let move_to = |first_name: &str, category: Id| {
            json!(CandidateSpec::example(first_name, category)).to_string()
        };

        // Moving a candidate with votes is refused and changes nothing.
        let response = client
            .put(uri!(modify_candidate(amani.id)))
            .header(ContentType::JSON)
            .body(move_to("Amani", treasurer.id))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        let stored = store.candidate(amani.id).await.unwrap().unwrap();
        assert_eq!(stored.category, president.id);
        assert_eq!(
            store.vote_counts(president.id).await.unwrap().get(&amani.id),
            Some(&1)
        );
        let outcome = cast_vote(
            store.as_ref(),
            voter,
            &treasurer.id.to_string(),
            &amani.id.to_string(),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, CastOutcome::UnknownCandidate);

        // Edits within the same category are still allowed.
        let response = client
            .put(uri!(modify_candidate(amani.id)))
            .header(ContentType::JSON)
            .body(move_to("Amina", president.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // A candidate without votes may move.
        let response = client
            .put(uri!(modify_candidate(baraka.id)))
            .header(ContentType::JSON)
            .body(move_to("Baraka", treasurer.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let stored = store.candidate(baraka.id).await.unwrap().unwrap();
        assert_eq!(stored.category, treasurer.id);
    }

    #[backend_test(admin)]
    async fn deactivate_voter(client: Client, store: Store) {
        let voter = store.insert_voter(NewVoter::example()).await.unwrap();

        let response = client
            .put(uri!(set_voter_active(voter.voter_id.as_str())))
            .header(ContentType::JSON)
            .body(json!(ActiveSpec { active: false }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(!store.voter(voter.id).await.unwrap().unwrap().active);

        let response = client
            .put(uri!(set_voter_active("nobody")))
            .header(ContentType::JSON)
            .body(json!(ActiveSpec { active: true }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn list_votes(client: Client, store: Store) {
        let vote = store
            .insert_vote(NewVote {
                voter: Id::new(),
                candidate: Id::new(),
                category: Id::new(),
                cast_at: Utc::now(),
            })
            .await
            .unwrap();

        let response = client.get(uri!(get_votes)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let votes: Vec<VoteDesc> = from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].id, ApiId::from(vote.id));
    }

    #[backend_test(voter)]
    async fn voters_are_not_admins(client: Client) {
        let response = client.get(uri!(get_votes)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn admin_routes_require_login(client: Client) {
        let response = client.get(uri!(get_categories)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
