//! 帖子与审核工作流
//!
//! 新帖进入 Pending，管理员批准后对信息流可见。举报只增计数；
//! 已通过的帖子累计举报达到阈值后自动回到审核队列重审。
//! 审核状态迁移在条目锁内校验，两个管理员并发处理只有一人成功。

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use huru_shared::error::{HuruError, Result};

use crate::models::{Comment, ModerationStatus, Post, PostKind};
use crate::state::CommunityState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl CommunityState {
    /// 获取帖子
    pub fn get_post(&self, post_id: &str) -> Result<Post> {
        self.posts
            .get(post_id)
            .ok_or_else(|| HuruError::not_found("Post", post_id))
    }

    /// 发帖，进入审核队列
    pub fn create_post(
        &self,
        author_id: String,
        author_name: String,
        content: String,
        kind: PostKind,
        tags: Vec<String>,
    ) -> Result<Post> {
        let post = Post {
            id: format!("PST-{}", Uuid::new_v4()),
            author_id,
            author_name,
            content,
            kind,
            timestamp: Utc::now(),
            likes: 0,
            comments: Vec::new(),
            moderation_status: ModerationStatus::Pending,
            flag_count: 0,
            tags,
        };
        self.posts.insert(&post.id, post.clone());
        tracing::info!(post_id = %post.id, kind = ?post.kind, "新帖已提交审核");
        Ok(post)
    }

    /// 信息流：仅已通过的帖子，最新在前
    pub fn feed(&self, kind: Option<PostKind>) -> Vec<Post> {
        let mut posts = self
            .posts
            .list_by(|post| post.is_visible() && kind.is_none_or(|k| post.kind == k));
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        posts
    }

    /// 点赞（祷告墙上即「为你祷告」）
    pub fn like_post(&self, post_id: &str) -> Result<Post> {
        self.posts
            .update(post_id, |post| post.likes += 1)
            .ok_or_else(|| HuruError::not_found("Post", post_id))
    }

    /// 举报帖子
    ///
    /// 计数只增不减；已通过的帖子达到阈值后回到审核队列。
    pub fn flag_post(&self, post_id: &str) -> Result<Post> {
        let threshold = self.flag_threshold;
        let updated = self.posts.update(post_id, |post| {
            post.flag_count += 1;
            if post.moderation_status == ModerationStatus::Approved
                && post.flag_count >= threshold
            {
                post.moderation_status = ModerationStatus::Pending;
            }
        });

        let post = updated.ok_or_else(|| HuruError::not_found("Post", post_id))?;
        tracing::info!(
            post_id = %post_id,
            flag_count = post.flag_count,
            status = ?post.moderation_status,
            "帖子被举报"
        );
        Ok(post)
    }

    /// 评论
    pub fn comment_on_post(
        &self,
        post_id: &str,
        author_id: String,
        author_name: String,
        content: String,
    ) -> Result<Post> {
        let comment = Comment {
            id: format!("CMT-{}", Uuid::new_v4()),
            author_id,
            author_name,
            content,
            timestamp: Utc::now(),
            likes: 0,
        };
        self.posts
            .update(post_id, move |post| post.comments.push(comment.clone()))
            .ok_or_else(|| HuruError::not_found("Post", post_id))
    }

    /// 审核队列：待审帖子，最早提交的在前
    pub fn moderation_queue(&self) -> Vec<Post> {
        let mut posts = self
            .posts
            .list_by(|post| post.moderation_status == ModerationStatus::Pending);
        posts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        posts
    }

    /// 审核裁决：Pending → Approved / Rejected
    pub fn moderate_post(&self, post_id: &str, approve: bool) -> Result<Post> {
        let mut transitioned = false;
        let updated = self.posts.update(post_id, |post| {
            if post.moderation_status == ModerationStatus::Pending {
                post.moderation_status = if approve {
                    ModerationStatus::Approved
                } else {
                    ModerationStatus::Rejected
                };
                transitioned = true;
            }
        });

        match updated {
            None => Err(HuruError::not_found("Post", post_id)),
            Some(post) if transitioned => {
                tracing::info!(
                    post_id = %post_id,
                    status = ?post.moderation_status,
                    "审核裁决完成"
                );
                Ok(post)
            }
            Some(post) => Err(HuruError::conflict(format!(
                "帖子状态为 {:?}，不在审核队列中",
                post.moderation_status
            ))),
        }
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 发帖请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub author_id: String,
    pub author_name: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    pub kind: PostKind,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 评论请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub author_id: String,
    pub author_name: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

/// 信息流查询参数
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub kind: Option<PostKind>,
}

/// 帖子响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub post: Post,
}

/// 帖子列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
    pub total: usize,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建帖子路由
pub fn post_routes() -> Router<Arc<CommunityState>> {
    Router::new()
        .route("/posts", get(feed))
        .route("/posts", post(create_post))
        .route("/posts/{post_id}", get(get_post))
        .route("/posts/{post_id}/like", post(like_post))
        .route("/posts/{post_id}/flag", post(flag_post))
        .route("/posts/{post_id}/comments", post(comment_on_post))
        .route("/admin/moderation/queue", get(moderation_queue))
        .route("/admin/posts/{post_id}/approve", post(approve_post))
        .route("/admin/posts/{post_id}/reject", post(reject_post))
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 信息流
#[tracing::instrument(skip(state))]
async fn feed(
    State(state): State<Arc<CommunityState>>,
    Query(query): Query<FeedQuery>,
) -> Json<PostListResponse> {
    let posts = state.feed(query.kind);
    let total = posts.len();
    Json(PostListResponse { posts, total })
}

/// 帖子详情
#[tracing::instrument(skip(state))]
async fn get_post(
    State(state): State<Arc<CommunityState>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state.get_post(&post_id)?;
    Ok(Json(PostResponse { post }))
}

/// 发帖
#[tracing::instrument(skip(state, req))]
async fn create_post(
    State(state): State<Arc<CommunityState>>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    req.validate()?;
    let post = state.create_post(req.author_id, req.author_name, req.content, req.kind, req.tags)?;
    Ok((StatusCode::CREATED, Json(PostResponse { post })))
}

/// 点赞
#[tracing::instrument(skip(state))]
async fn like_post(
    State(state): State<Arc<CommunityState>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state.like_post(&post_id)?;
    Ok(Json(PostResponse { post }))
}

/// 举报
#[tracing::instrument(skip(state))]
async fn flag_post(
    State(state): State<Arc<CommunityState>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state.flag_post(&post_id)?;
    Ok(Json(PostResponse { post }))
}

/// 评论
#[tracing::instrument(skip(state, req))]
async fn comment_on_post(
    State(state): State<Arc<CommunityState>>,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    req.validate()?;
    let post = state.comment_on_post(&post_id, req.author_id, req.author_name, req.content)?;
    Ok((StatusCode::CREATED, Json(PostResponse { post })))
}

/// 审核队列（管理员）
#[tracing::instrument(skip(state))]
async fn moderation_queue(State(state): State<Arc<CommunityState>>) -> Json<PostListResponse> {
    let posts = state.moderation_queue();
    let total = posts.len();
    Json(PostListResponse { posts, total })
}

/// 批准帖子（管理员）
#[tracing::instrument(skip(state))]
async fn approve_post(
    State(state): State<Arc<CommunityState>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state.moderate_post(&post_id, true)?;
    Ok(Json(PostResponse { post }))
}

/// 驳回帖子（管理员）
#[tracing::instrument(skip(state))]
async fn reject_post(
    State(state): State<Arc<CommunityState>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state.moderate_post(&post_id, false)?;
    Ok(Json(PostResponse { post }))
}

// ============================================================================
// 单元测试
// ============================================================================
