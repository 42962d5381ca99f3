use chrono::{DateTime, Utc};
use sarau_storage::{
    ApprovedJoin, CreateGroupParams, Group, GroupId, GroupMember, GroupRole, JoinRequest,
    JoinRequestId, JoinRequestStatus, Store, StoreError, UpdateGroupParams, UserId,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const GROUP_COLUMNS: &str = "id, name, description, creator_id, image_url, cover_url, \
                             is_private, member_count, created_at, updated_at";

const REQUEST_COLUMNS: &str =
    "id, group_id, user_id, status, created_at, resolved_at, resolved_by";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.sarau/groups.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".sarau");
        std::fs::create_dir_all(&dir).map_err(backend)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(backend)?;
        }
        let path = dir.join("groups.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        // One connection serializes writers; every multi-row mutation below is a
        // transaction on that connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(backend)?;

        Ok(Self { pool })
    }
}

// ───────────────────────────── Row mapping ─────────────────────────────

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
        _ => backend(e),
    }
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {}", micros)))
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(backend)
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
    description: Option<String>,
    creator_id: String,
    image_url: Option<String>,
    cover_url: Option<String>,
    is_private: bool,
    member_count: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<GroupRow> for Group {
    type Error = StoreError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        Ok(Group {
            id: GroupId(parse_uuid(&row.id)?),
            name: row.name,
            description: row.description,
            creator_id: UserId(parse_uuid(&row.creator_id)?),
            image_url: row.image_url,
            cover_url: row.cover_url,
            is_private: row.is_private,
            member_count: row.member_count,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    group_id: String,
    user_id: String,
    role: String,
    created_at: i64,
}

impl TryFrom<MemberRow> for GroupMember {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(GroupMember {
            group_id: GroupId(parse_uuid(&row.group_id)?),
            user_id: UserId(parse_uuid(&row.user_id)?),
            role: row.role.parse::<GroupRole>().map_err(backend)?,
            created_at: from_micros(row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: String,
    group_id: String,
    user_id: String,
    status: String,
    created_at: i64,
    resolved_at: Option<i64>,
    resolved_by: Option<String>,
}

impl TryFrom<RequestRow> for JoinRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(JoinRequest {
            id: JoinRequestId(parse_uuid(&row.id)?),
            group_id: GroupId(parse_uuid(&row.group_id)?),
            user_id: UserId(parse_uuid(&row.user_id)?),
            status: row
                .status
                .parse::<JoinRequestStatus>()
                .map_err(StoreError::Backend)?,
            created_at: from_micros(row.created_at)?,
            resolved_at: row.resolved_at.map(from_micros).transpose()?,
            resolved_by: row
                .resolved_by
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(UserId),
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl SqliteStore {
    /// Conditionally move a pending request to a terminal status inside `tx`.
    /// `Conflict` if the request exists but is already resolved.
    async fn resolve_pending(
        tx: &mut sqlx::SqliteConnection,
        request_id: &JoinRequestId,
        status: JoinRequestStatus,
        resolved_by: &UserId,
    ) -> Result<JoinRequest, StoreError> {
        let sql = format!(
            "UPDATE join_requests SET status = ?, resolved_at = ?, resolved_by = ?
             WHERE id = ? AND status = 'pending'
             RETURNING {REQUEST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(status.as_str())
            .bind(now_micros())
            .bind(resolved_by.0.to_string())
            .bind(request_id.0.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let exists: Option<(String,)> =
                    sqlx::query_as("SELECT id FROM join_requests WHERE id = ?")
                        .bind(request_id.0.to_string())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(backend)?;
                Err(if exists.is_some() {
                    StoreError::Conflict
                } else {
                    StoreError::NotFound
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Groups ─────────────────────────────

    async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError> {
        let group_id = GroupId::new();
        let now = now_micros();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO groups(id, name, description, creator_id, image_url, cover_url,
                                is_private, member_count, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(group_id.0.to_string())
        .bind(&params.name)
        .bind(&params.description)
        .bind(params.creator_id.0.to_string())
        .bind(&params.image_url)
        .bind(&params.cover_url)
        .bind(params.is_private)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(insert_error)?;

        sqlx::query(
            "INSERT INTO group_members(group_id, user_id, role, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(group_id.0.to_string())
        .bind(params.creator_id.0.to_string())
        .bind(GroupRole::Creator.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(insert_error)?;

        tx.commit().await.map_err(backend)?;

        Ok(Group {
            id: group_id,
            name: params.name.clone(),
            description: params.description.clone(),
            creator_id: params.creator_id,
            image_url: params.image_url.clone(),
            cover_url: params.cover_url.clone(),
            is_private: params.is_private,
            member_count: 1,
            created_at: from_micros(now)?,
            updated_at: from_micros(now)?,
        })
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?");
        sqlx::query_as::<_, GroupRow>(&sql)
            .bind(group_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let sql =
            format!("SELECT {GROUP_COLUMNS} FROM groups ORDER BY created_at DESC, rowid DESC");
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        collect(rows)
    }

    async fn list_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT g.id, g.name, g.description, g.creator_id, g.image_url, g.cover_url,
                    g.is_private, g.member_count, g.created_at, g.updated_at
             FROM groups g
             INNER JOIN group_members gm ON g.id = gm.group_id
             WHERE gm.user_id = ?
             ORDER BY g.created_at DESC, g.rowid DESC",
        )
        .bind(user_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn update_group(
        &self,
        group_id: &GroupId,
        params: &UpdateGroupParams,
    ) -> Result<Group, StoreError> {
        let sql = format!(
            "UPDATE groups SET
                name = COALESCE(?, name),
                description = CASE WHEN ? THEN ? ELSE description END,
                image_url = CASE WHEN ? THEN ? ELSE image_url END,
                cover_url = CASE WHEN ? THEN ? ELSE cover_url END,
                is_private = COALESCE(?, is_private),
                updated_at = ?
             WHERE id = ?
             RETURNING {GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, GroupRow>(&sql)
            .bind(&params.name)
            .bind(params.description.is_some())
            .bind(params.description.clone().flatten())
            .bind(params.image_url.is_some())
            .bind(params.image_url.clone().flatten())
            .bind(params.cover_url.is_some())
            .bind(params.cover_url.clone().flatten())
            .bind(params.is_private)
            .bind(now_micros())
            .bind(group_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn delete_group(&self, group_id: &GroupId) -> Result<(), StoreError> {
        let id = group_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM join_requests WHERE group_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        sqlx::query("DELETE FROM group_members WHERE group_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn recount_members(&self, group_id: &GroupId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE groups
             SET member_count = (SELECT COUNT(*) FROM group_members WHERE group_id = groups.id),
                 updated_at = ?
             WHERE id = ?
             RETURNING member_count",
        )
        .bind(now_micros())
        .bind(group_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)
    }

    // ───────────────────────────── Members ────────────────────────────

    async fn get_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMember, StoreError> {
        sqlx::query_as::<_, MemberRow>(
            "SELECT group_id, user_id, role, created_at FROM group_members
             WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?
        .try_into()
    }

    async fn list_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, StoreError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT group_id, user_id, role, created_at FROM group_members
             WHERE group_id = ?
             ORDER BY CASE role WHEN 'creator' THEN 0 WHEN 'moderator' THEN 1 ELSE 2 END,
                      created_at, rowid",
        )
        .bind(group_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn add_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<i64, StoreError> {
        let now = now_micros();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Increment first so a missing group surfaces as NotFound; a duplicate insert
        // below rolls the increment back with the rest of the transaction.
        let member_count = sqlx::query_scalar::<_, i64>(
            "UPDATE groups SET member_count = member_count + 1, updated_at = ?
             WHERE id = ?
             RETURNING member_count",
        )
        .bind(now)
        .bind(group_id.0.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        sqlx::query(
            "INSERT INTO group_members(group_id, user_id, role, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(group_id.0.to_string())
        .bind(user_id.0.to_string())
        .bind(role.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(insert_error)?;

        tx.commit().await.map_err(backend)?;
        Ok(member_count)
    }

    async fn remove_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let result = sqlx::query(
            "DELETE FROM group_members
             WHERE group_id = ? AND user_id = ? AND role <> 'creator'",
        )
        .bind(group_id.0.to_string())
        .bind(user_id.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let member_count = sqlx::query_scalar::<_, i64>(
            "UPDATE groups SET member_count = MAX(member_count - 1, 0), updated_at = ?
             WHERE id = ?
             RETURNING member_count",
        )
        .bind(now_micros())
        .bind(group_id.0.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        tx.commit().await.map_err(backend)?;
        Ok(member_count)
    }

    async fn update_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE group_members SET role = ? WHERE group_id = ? AND user_id = ?")
                .bind(role.as_str())
                .bind(group_id.0.to_string())
                .bind(user_id.0.to_string())
                .execute(&self.pool)
                .await
                .map_err(insert_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn count_members(&self, group_id: &GroupId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM group_members WHERE group_id = ?")
            .bind(group_id.0.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    // ───────────────────────────── Join Requests ──────────────────────

    async fn create_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<JoinRequest, StoreError> {
        let request_id = JoinRequestId::new();
        let now = now_micros();

        sqlx::query(
            "INSERT INTO join_requests(id, group_id, user_id, status, created_at)
             VALUES(?, ?, ?, 'pending', ?)",
        )
        .bind(request_id.0.to_string())
        .bind(group_id.0.to_string())
        .bind(user_id.0.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(JoinRequest {
            id: request_id,
            group_id: *group_id,
            user_id: *user_id,
            status: JoinRequestStatus::Pending,
            created_at: from_micros(now)?,
            resolved_at: None,
            resolved_by: None,
        })
    }

    async fn get_join_request(
        &self,
        request_id: &JoinRequestId,
    ) -> Result<JoinRequest, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM join_requests WHERE id = ?");
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(request_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn get_pending_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<JoinRequest, StoreError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM join_requests
             WHERE group_id = ? AND user_id = ? AND status = 'pending'"
        );
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(group_id.0.to_string())
            .bind(user_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn list_pending_join_requests(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<JoinRequest>, StoreError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM join_requests
             WHERE group_id = ? AND status = 'pending'
             ORDER BY created_at, rowid"
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(group_id.0.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        collect(rows)
    }

    async fn approve_join_request(
        &self,
        request_id: &JoinRequestId,
        resolved_by: &UserId,
    ) -> Result<ApprovedJoin, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let request =
            Self::resolve_pending(&mut tx, request_id, JoinRequestStatus::Approved, resolved_by)
                .await?;

        let now = now_micros();
        let inserted = sqlx::query(
            "INSERT INTO group_members(group_id, user_id, role, created_at) VALUES(?, ?, ?, ?)
             ON CONFLICT(group_id, user_id) DO NOTHING",
        )
        .bind(request.group_id.0.to_string())
        .bind(request.user_id.0.to_string())
        .bind(GroupRole::Member.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected()
            > 0;

        let member_count: Option<i64> = if inserted {
            sqlx::query_scalar::<_, i64>(
                "UPDATE groups SET member_count = member_count + 1, updated_at = ?
                 WHERE id = ?
                 RETURNING member_count",
            )
            .bind(now)
            .bind(request.group_id.0.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?
        } else {
            sqlx::query_scalar::<_, i64>("SELECT member_count FROM groups WHERE id = ?")
                .bind(request.group_id.0.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?
        };
        let member_count = member_count.ok_or(StoreError::NotFound)?;

        tx.commit().await.map_err(backend)?;

        Ok(ApprovedJoin {
            request,
            member_added: inserted,
            member_count,
        })
    }

    async fn reject_join_request(
        &self,
        request_id: &JoinRequestId,
        resolved_by: &UserId,
    ) -> Result<JoinRequest, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        Self::resolve_pending(&mut conn, request_id, JoinRequestStatus::Rejected, resolved_by)
            .await
    }
}
