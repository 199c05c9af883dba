use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;
use crate::types::AppResult;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, author_id, content, is_ai, task_proposal, search_result, created_at";

pub struct DatabaseOperations;

impl DatabaseOperations {
    // User operations
    pub async fn list_users(pool: &PgPool, filter: &UserFilter) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR username = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.username.as_deref())
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn get_user(pool: &PgPool, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn create_user(
        pool: &PgPool,
        username: &str,
        email: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, display_name, avatar_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(display_name)
        .bind(avatar_url)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn update_user(pool: &PgPool, id: Uuid, update: &UpdateUserDto) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                display_name = COALESCE($4, display_name),
                avatar_url = COALESCE($5, avatar_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.username.as_deref())
        .bind(update.email.as_deref())
        .bind(update.display_name.as_deref())
        .bind(update.avatar_url.as_deref())
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn delete_user(pool: &PgPool, id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    // Conversation operations
    pub async fn list_conversations(
        pool: &PgPool,
        filter: &ConversationFilter,
    ) -> AppResult<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE ($1::text IS NULL OR type = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.kind.as_deref())
        .fetch_all(pool)
        .await?;

        Ok(conversations)
    }

    pub async fn get_conversation(pool: &PgPool, id: Uuid) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(conversation)
    }

    pub async fn create_conversation(
        pool: &PgPool,
        name: &str,
        kind: &str,
        avatar_url: Option<&str>,
    ) -> AppResult<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, name, type, avatar_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(kind)
        .bind(avatar_url)
        .fetch_one(pool)
        .await?;

        Ok(conversation)
    }

    pub async fn update_conversation(
        pool: &PgPool,
        id: Uuid,
        update: &UpdateConversationDto,
    ) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            UPDATE conversations SET
                name = COALESCE($2, name),
                type = COALESCE($3, type),
                avatar_url = COALESCE($4, avatar_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.kind.as_deref())
        .bind(update.avatar_url.as_deref())
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    pub async fn delete_conversation(pool: &PgPool, id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    // Message operations
    pub async fn list_messages(pool: &PgPool, filter: &MessageFilter) -> AppResult<Vec<Message>> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE ($1::uuid IS NULL OR conversation_id = $1)
              AND ($2::uuid IS NULL OR author_id = $2)
            ORDER BY created_at DESC
            "#
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(filter.conversation_id)
            .bind(filter.author_id)
            .fetch_all(pool)
            .await?;

        Ok(messages)
    }

    pub async fn get_message(pool: &PgPool, id: Uuid) -> AppResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(message)
    }

    pub async fn create_message(
        pool: &PgPool,
        conversation_id: Uuid,
        author_id: Uuid,
        content: &str,
        dto: &CreateMessageDto,
    ) -> AppResult<Message> {
        let sql = format!(
            r#"
            INSERT INTO messages (id, conversation_id, author_id, content, is_ai, task_proposal, search_result)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(Uuid::new_v4())
            .bind(conversation_id)
            .bind(author_id)
            .bind(content)
            .bind(dto.is_ai.unwrap_or(false))
            .bind(dto.task_proposal.clone())
            .bind(dto.search_result.clone())
            .fetch_one(pool)
            .await?;

        Ok(message)
    }

    /// Partial update. Changing the content clears the stored embedding.
    pub async fn update_message(
        pool: &PgPool,
        id: Uuid,
        update: &UpdateMessageDto,
    ) -> AppResult<Option<Message>> {
        let sql = format!(
            r#"
            UPDATE messages SET
                conversation_id = COALESCE($2, conversation_id),
                author_id = COALESCE($3, author_id),
                content = COALESCE($4, content),
                embedding = CASE WHEN $4::text IS NULL THEN embedding ELSE NULL END,
                is_ai = COALESCE($5, is_ai),
                task_proposal = COALESCE($6, task_proposal),
                search_result = COALESCE($7, search_result)
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .bind(update.conversation_id)
            .bind(update.author_id)
            .bind(update.content.as_deref())
            .bind(update.is_ai)
            .bind(update.task_proposal.clone())
            .bind(update.search_result.clone())
            .fetch_optional(pool)
            .await?;

        Ok(message)
    }

    pub async fn delete_message(pool: &PgPool, id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    // Task operations
    pub async fn list_tasks(pool: &PgPool, filter: &TaskFilter) -> AppResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR proposed_by = $2)
              AND ($3::uuid IS NULL OR message_id = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status.as_deref())
        .bind(filter.proposed_by)
        .bind(filter.message_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    pub async fn get_task(pool: &PgPool, id: Uuid) -> AppResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    pub async fn create_task(
        pool: &PgPool,
        action: &str,
        summary: &str,
        proposed_by: Uuid,
        dto: &CreateTaskDto,
    ) -> AppResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, message_id, task_id, action, summary, details, status, proposed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(dto.message_id)
        .bind(dto.task_id)
        .bind(action)
        .bind(summary)
        .bind(dto.details.as_deref())
        .bind(dto.status.as_deref().unwrap_or("pending"))
        .bind(proposed_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    pub async fn update_task(pool: &PgPool, id: Uuid, update: &UpdateTaskDto) -> AppResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                message_id = COALESCE($2, message_id),
                task_id = COALESCE($3, task_id),
                action = COALESCE($4, action),
                summary = COALESCE($5, summary),
                details = COALESCE($6, details),
                status = COALESCE($7, status),
                proposed_by = COALESCE($8, proposed_by)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.message_id)
        .bind(update.task_id)
        .bind(update.action.as_deref())
        .bind(update.summary.as_deref())
        .bind(update.details.as_deref())
        .bind(update.status.as_deref())
        .bind(update.proposed_by)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    pub async fn delete_task(pool: &PgPool, id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
