use sarau_groups::{Groups, MembershipOutcome, NewGroup, Resolution};
use sarau_storage::{
    Group, GroupId, GroupMember, GroupRole, JoinRequest, JoinRequestId, UpdateGroupParams, UserId,
};
use sarau_store_sqlite::SqliteStore;
use serde::Serialize;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs: the services, who is acting, and how to print.
pub struct Context {
    pub groups: Groups<SqliteStore>,
    pub actor: Option<UserId>,
    pub json: bool,
}

impl Context {
    fn actor(&self) -> Result<UserId, Box<dyn std::error::Error>> {
        self.actor
            .ok_or_else(|| "this command needs an acting user (use --as or SARAU_USER)".into())
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> CmdResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

fn print_group(group: &Group) {
    let visibility = if group.is_private { "private" } else { "open" };
    println!("{} ({})", group.name, visibility);
    println!("  ID: {}", group.id);
    println!("  Creator: {}", group.creator_id);
    println!("  Members: {}", group.member_count);
    if let Some(description) = &group.description {
        println!("  Description: {}", description);
    }
    if let Some(url) = &group.image_url {
        println!("  Image: {}", url);
    }
    if let Some(url) = &group.cover_url {
        println!("  Cover: {}", url);
    }
}

fn print_request(request: &JoinRequest) {
    println!(
        "{}  user={}  status={}  created={}",
        request.id,
        request.user_id,
        request.status,
        request.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_outcome(outcome: &MembershipOutcome) {
    match outcome {
        MembershipOutcome::Member { role, member_count } => {
            println!("Member as {} ({} members)", role, member_count)
        }
        MembershipOutcome::Requested {
            request,
            member_count,
        } => println!(
            "Join request {} is {} ({} members)",
            request.id, request.status, member_count
        ),
        MembershipOutcome::Left { member_count } => {
            println!("Not a member ({} members)", member_count)
        }
    }
}

// ─────────────────────────────────────── Groups ───────────────────────────────────────

pub async fn cmd_group_create(
    ctx: &Context,
    name: String,
    description: Option<String>,
    private: bool,
    image_url: Option<String>,
    cover_url: Option<String>,
) -> CmdResult {
    let creator = ctx.actor()?;
    let group = ctx
        .groups
        .create_group(
            &creator,
            NewGroup {
                name,
                description,
                image_url,
                cover_url,
                is_private: private,
            },
        )
        .await?;

    ctx.emit(&group, |g| {
        println!("Created group:");
        print_group(g);
    })
}

pub async fn cmd_group_show(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let group = ctx.groups.get_group(group_id).await?;
    ctx.emit(&group, print_group)
}

pub async fn cmd_group_list(ctx: &Context, mine: bool) -> CmdResult {
    let groups = if mine {
        ctx.groups.list_user_groups(&ctx.actor()?).await?
    } else {
        ctx.groups.list_groups().await?
    };

    ctx.emit(&groups, |groups| {
        if groups.is_empty() {
            println!("No groups found");
            return;
        }
        for g in groups {
            let visibility = if g.is_private { "private" } else { "open" };
            println!("{}  {}  [{}]  {} members", g.id, g.name, visibility, g.member_count);
        }
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_group_update(
    ctx: &Context,
    group_id: &GroupId,
    name: Option<String>,
    description: Option<String>,
    clear_description: bool,
    image_url: Option<String>,
    cover_url: Option<String>,
    private: Option<bool>,
) -> CmdResult {
    let actor = ctx.actor()?;
    let changes = UpdateGroupParams {
        name,
        description: if clear_description {
            Some(None)
        } else {
            description.map(Some)
        },
        image_url: image_url.map(Some),
        cover_url: cover_url.map(Some),
        is_private: private,
    };
    let group = ctx.groups.update_group(group_id, &actor, changes).await?;

    ctx.emit(&group, |g| {
        println!("Updated group:");
        print_group(g);
    })
}

pub async fn cmd_group_delete(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let actor = ctx.actor()?;
    ctx.groups.delete_group(group_id, &actor).await?;
    if !ctx.json {
        println!("✓ Group {} deleted", group_id);
    }
    Ok(())
}

pub async fn cmd_group_recount(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let actor = ctx.actor()?;
    let member_count = ctx.groups.recount_members(group_id, &actor).await?;

    #[derive(Serialize)]
    struct Recount {
        member_count: i64,
    }
    ctx.emit(&Recount { member_count }, |r| {
        println!("Group has {} members", r.member_count)
    })
}

// ─────────────────────────────────────── Members ──────────────────────────────────────

pub async fn cmd_member_list(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let members = ctx.groups.list_members(group_id).await?;
    ctx.emit(&members, |members: &Vec<GroupMember>| {
        for m in members {
            println!(
                "{}  {:<9}  joined {}",
                m.user_id,
                m.role.as_str(),
                m.created_at.format("%Y-%m-%d")
            );
        }
    })
}

pub async fn cmd_member_join(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let outcome = ctx.groups.join(group_id, &ctx.actor()?).await?;
    ctx.emit(&outcome, print_outcome)
}

pub async fn cmd_member_leave(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let outcome = ctx.groups.leave(group_id, &ctx.actor()?).await?;
    ctx.emit(&outcome, print_outcome)
}

pub async fn cmd_member_toggle(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let outcome = ctx.groups.toggle_membership(group_id, &ctx.actor()?).await?;
    ctx.emit(&outcome, print_outcome)
}

pub async fn cmd_member_status(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let status = ctx.groups.membership_status(group_id, &ctx.actor()?).await?;
    ctx.emit(&status, |s| match (&s.role, &s.pending_request) {
        (Some(role), _) => println!("Member as {}", role),
        (None, Some(request)) => println!("Join request {} is pending", request.id),
        (None, None) => println!("Not a member"),
    })
}

pub async fn cmd_member_role(
    ctx: &Context,
    group_id: &GroupId,
    user_id: &UserId,
    role: GroupRole,
) -> CmdResult {
    let actor = ctx.actor()?;
    let member = ctx
        .groups
        .change_member_role(group_id, &actor, user_id, role)
        .await?;
    ctx.emit(&member, |m| println!("✓ {} is now {}", m.user_id, m.role))
}

pub async fn cmd_member_remove(ctx: &Context, group_id: &GroupId, user_id: &UserId) -> CmdResult {
    let actor = ctx.actor()?;
    let member_count = ctx.groups.remove_member(group_id, &actor, user_id).await?;

    #[derive(Serialize)]
    struct Removed<'a> {
        user_id: &'a UserId,
        member_count: i64,
    }
    ctx.emit(
        &Removed {
            user_id,
            member_count,
        },
        |r| println!("✓ Removed {} ({} members left)", r.user_id, r.member_count),
    )
}

// ─────────────────────────────────────── Requests ─────────────────────────────────────

pub async fn cmd_request_create(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let request = ctx.groups.request_to_join(group_id, &ctx.actor()?).await?;
    ctx.emit(&request, print_request)
}

pub async fn cmd_request_list(ctx: &Context, group_id: &GroupId) -> CmdResult {
    let requests = ctx
        .groups
        .list_pending_requests(group_id, &ctx.actor()?)
        .await?;
    ctx.emit(&requests, |requests: &Vec<JoinRequest>| {
        if requests.is_empty() {
            println!("No pending requests");
        }
        for r in requests {
            print_request(r);
        }
    })
}

pub async fn cmd_request_resolve(
    ctx: &Context,
    group_id: &GroupId,
    request_id: &JoinRequestId,
    resolution: Resolution,
) -> CmdResult {
    let actor = ctx.actor()?;
    let resolved = ctx
        .groups
        .resolve_request(group_id, request_id, resolution, &actor)
        .await?;
    ctx.emit(&resolved, |r| {
        print_request(&r.request);
        println!("Group has {} members", r.member_count);
    })
}
