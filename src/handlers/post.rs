use std::sync::Arc;

use actix_web::web::{Data, Json, Path, Query};
use log::{debug, error};

use crate::auth::now;
use crate::authz::Subject;
use crate::code::generate_object_id;
use crate::context::ServerContext;
use crate::db::types::{CreatePostParams, PostQuery, UpdatePostParams};
use crate::types::post::{PageQuery, PatchPostRequest, Post, PutPostRequest};
use crate::types::response::{CreatedResponse, ListResponse, Response};

use super::check_id;

pub async fn list_posts(sc: Data<Arc<ServerContext>>) -> Response<ListResponse<Post>> {
    let result = sc
        .db
        .run(|tx| {
            let total = tx.count_posts()?;
            let items = tx.list_posts(PostQuery::default())?;
            Ok(ListResponse { items, total })
        })
        .await;

    match result {
        Ok(posts) => Response::with_data(posts),
        Err(e) => {
            error!("Failed to list posts: {e:#}");
            Response::database_error()
        }
    }
}

pub async fn list_paged_posts(
    query: Query<PageQuery>,
    sc: Data<Arc<ServerContext>>,
) -> Response<ListResponse<Post>> {
    let query = query.into_inner();
    if let Err(e) = query.validate() {
        return Response::bad_request(format!("{e:#}"));
    }
    debug!("List posts page {} limit {}", query.page, query.limit);

    let result = sc
        .db
        .run(move |tx| {
            let total = tx.count_posts()?;
            let items = tx.list_posts(PostQuery {
                limit: Some(query.limit),
                offset: Some(query.offset()),
            })?;
            Ok(ListResponse { items, total })
        })
        .await;

    match result {
        Ok(posts) => Response::with_data(posts),
        Err(e) => {
            error!("Failed to list paged posts: {e:#}");
            Response::database_error()
        }
    }
}

pub async fn get_post(id: Path<String>, sc: Data<Arc<ServerContext>>) -> Response<Post> {
    let id = id.into_inner();
    if let Err(resp) = check_id(&id) {
        return resp;
    }

    match sc.db.run(move |tx| tx.get_post(&id)).await {
        Ok(Some(post)) => Response::with_data(post),
        Ok(None) => Response::resource_not_found(),
        Err(e) => {
            error!("Failed to get post: {e:#}");
            Response::database_error()
        }
    }
}

/// The owner is always the verified caller, never a value from the body.
pub async fn create_post(
    subject: Subject,
    req: Json<PutPostRequest>,
    sc: Data<Arc<ServerContext>>,
) -> Response<CreatedResponse> {
    let req = req.into_inner();
    if let Err(e) = req.validate() {
        return Response::bad_request(format!("{e:#}"));
    }

    let params = CreatePostParams {
        id: generate_object_id(),
        title: req.title,
        text: req.text,
        owner: subject.id,
        create_time: now(),
    };
    debug!("Create post: {params:?}");

    let id = params.id.clone();
    match sc.db.run(move |tx| tx.create_post(params)).await {
        Ok(()) => Response::created(CreatedResponse { id }),
        Err(e) => {
            error!("Failed to create post: {e:#}");
            Response::database_error()
        }
    }
}

pub async fn patch_post(
    id: Path<String>,
    req: Json<PatchPostRequest>,
    sc: Data<Arc<ServerContext>>,
) -> Response<()> {
    let id = id.into_inner();
    if let Err(resp) = check_id(&id) {
        return resp;
    }
    let req = req.into_inner();
    if let Err(e) = req.validate() {
        return Response::bad_request(format!("{e:#}"));
    }
    debug!("Patch post {id}: {req:?}");

    let result = sc
        .db
        .run(move |tx| {
            if !tx.has_post(&id)? {
                return Ok(false);
            }
            tx.update_post(UpdatePostParams {
                id,
                title: req.title,
                text: req.text,
                update_time: now(),
            })?;
            Ok(true)
        })
        .await;

    match result {
        Ok(true) => Response::ok(),
        Ok(false) => Response::resource_not_found(),
        Err(e) => {
            error!("Failed to patch post: {e:#}");
            Response::database_error()
        }
    }
}

pub async fn delete_post(id: Path<String>, sc: Data<Arc<ServerContext>>) -> Response<()> {
    let id = id.into_inner();
    if let Err(resp) = check_id(&id) {
        return resp;
    }
    debug!("Delete post {id}");

    let result = sc
        .db
        .run(move |tx| {
            if !tx.has_post(&id)? {
                return Ok(false);
            }
            tx.delete_post(&id)?;
            Ok(true)
        })
        .await;

    match result {
        Ok(true) => Response::ok(),
        Ok(false) => Response::resource_not_found(),
        Err(e) => {
            error!("Failed to delete post: {e:#}");
            Response::database_error()
        }
    }
}
