use clap::{Parser, Subcommand};
use sarau_groups::Resolution;
use sarau_storage::{GroupId, GroupRole, JoinRequestId, UserId};

#[derive(Parser)]
#[command(name = "sarau-admin")]
#[command(about = "Administer sarau community groups")]
pub struct Cli {
    /// Database URL (defaults to ~/.sarau/groups.db)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Act as this user
    #[arg(long = "as", env = "SARAU_USER", value_name = "USER_ID")]
    pub as_user: Option<UserId>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Group commands
    Group {
        #[command(subcommand)]
        group_cmd: GroupCommand,
    },
    /// Membership commands
    Member {
        #[command(subcommand)]
        member_cmd: MemberCommand,
    },
    /// Join request commands (private groups)
    Request {
        #[command(subcommand)]
        request_cmd: RequestCommand,
    },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// Create a group owned by the acting user
    Create {
        /// Group name
        name: String,
        /// Group description
        #[arg(long)]
        description: Option<String>,
        /// Require moderator approval to join
        #[arg(long)]
        private: bool,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        cover_url: Option<String>,
    },
    /// Show a group
    Show { group_id: GroupId },
    /// List groups
    List {
        /// Only groups the acting user belongs to
        #[arg(long)]
        mine: bool,
    },
    /// Update a group (moderators edit details, the creator also privacy)
    Update {
        group_id: GroupId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        cover_url: Option<String>,
        /// Make the group private (true) or open (false)
        #[arg(long)]
        private: Option<bool>,
    },
    /// Delete a group (creator only)
    Delete { group_id: GroupId },
    /// Recompute the member counter from membership rows (creator only)
    Recount { group_id: GroupId },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// List members of a group
    List { group_id: GroupId },
    /// Join an open group or request to join a private one
    Join { group_id: GroupId },
    /// Leave a group
    Leave { group_id: GroupId },
    /// Join if not a member, otherwise leave
    Toggle { group_id: GroupId },
    /// Show the acting user's membership in a group
    Status { group_id: GroupId },
    /// Change a member's role (creator only)
    Role {
        group_id: GroupId,
        user_id: UserId,
        /// member or moderator
        role: GroupRole,
    },
    /// Remove a member
    Remove { group_id: GroupId, user_id: UserId },
}

#[derive(Subcommand)]
pub enum RequestCommand {
    /// Ask to join a private group
    Create { group_id: GroupId },
    /// List pending requests (moderators and creator)
    List { group_id: GroupId },
    /// Approve or reject a pending request
    Resolve {
        group_id: GroupId,
        request_id: JoinRequestId,
        /// approve or reject
        resolution: Resolution,
    },
}
