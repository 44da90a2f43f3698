use std::{fmt, fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::credentials::Credentials;
use crate::format::format_description;
use crate::script::{self, ArgList, Invocation, Script};

const EXAMPLES: &str = r#"Examples:
  vikunja create-task --project WORK --title "Task" --description "..." --priority 4
  vikunja edit-task --id 123 --title "New title" --priority 5
  vikunja search --query "bug"
  vikunja tasks --project WORK --count 10
  vikunja add-comment --id 123 --comment "Working on this"
  vikunja move-task --id 123 --bucket "In Progress"
  vikunja invite-user --project WORK --user "maria@example.com" --rights write"#;

/// vikunja cli
#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Vikunja task manager, a wrapper around vikunja.sh that formats descriptions as HTML.",
    after_help = EXAMPLES
)]
pub struct Vikunja {
    /// Sets logging to "debug" level, defaults to "info"
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new task (with auto-format)
    CreateTask {
        /// Project name (WORK, PERSONAL)
        #[clap(long)]
        project: String,

        /// Task title
        #[clap(long)]
        title: String,

        #[clap(flatten)]
        description: Description,

        /// Due date (YYYY-MM-DD)
        #[clap(long)]
        due: Option<String>,

        /// Priority (1-5)
        #[clap(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: Option<u8>,

        /// Kanban stage/bucket
        #[clap(long, alias = "stage")]
        bucket: Option<String>,
    },
    /// Edit existing task
    EditTask {
        /// Task ID
        #[clap(long)]
        id: String,

        /// New task title
        #[clap(long)]
        title: Option<String>,

        #[clap(flatten)]
        description: Description,

        /// Due date (YYYY-MM-DD)
        #[clap(long)]
        due: Option<String>,

        /// Priority (1-5)
        #[clap(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: Option<u8>,
    },
    /// Delete a task
    DeleteTask {
        #[clap(flatten)]
        task: TaskId,
    },
    /// List tasks
    Tasks {
        /// Project name
        #[clap(long)]
        project: Option<String>,

        /// Number of items to show
        #[clap(long)]
        count: Option<u32>,

        /// Search text
        #[clap(long)]
        search: Option<String>,

        /// Filter expression
        #[clap(long)]
        filter: Option<String>,

        /// Filter tasks by assignee username
        #[clap(long, alias = "assignee")]
        assign: Option<String>,

        /// Sort field
        #[clap(long)]
        sort: Option<String>,

        /// Sort order
        #[clap(long, value_enum)]
        order: Option<Order>,
    },
    /// Search tasks across all projects
    Search {
        /// Search query
        #[clap(long)]
        query: String,
    },
    /// Show overdue tasks
    Overdue {
        /// Project name
        #[clap(long)]
        project: Option<String>,
    },
    /// Show tasks due soon
    Due {
        /// Hours ahead to look
        #[clap(long)]
        hours: Option<u32>,

        /// Project name
        #[clap(long)]
        project: Option<String>,
    },
    /// Mark task as complete
    Complete {
        #[clap(flatten)]
        task: TaskId,
    },
    /// Move task to different stage
    MoveTask {
        /// Task ID
        #[clap(long)]
        id: String,

        /// Kanban stage/bucket
        #[clap(long, alias = "stage")]
        bucket: String,

        /// Project name
        #[clap(long)]
        project: Option<String>,
    },
    /// Assign task to user
    AssignTask {
        /// Task ID
        #[clap(long)]
        id: String,

        /// Username or email
        #[clap(long)]
        user: String,
    },
    /// Get task details
    Task {
        #[clap(flatten)]
        task: TaskId,
    },
    /// List all labels
    Labels,
    /// Add label to task
    AddLabel {
        #[clap(flatten)]
        label: TaskLabel,
    },
    /// Remove label from task
    RemoveLabel {
        #[clap(flatten)]
        label: TaskLabel,
    },
    /// List task comments
    Comments {
        #[clap(flatten)]
        task: TaskId,
    },
    /// Add comment to task
    AddComment {
        /// Task ID
        #[clap(long)]
        id: String,

        /// Comment text
        #[clap(long, allow_hyphen_values = true)]
        comment: String,
    },
    /// List project users
    Users {
        #[clap(flatten)]
        project: ProjectName,
    },
    /// List project teams
    ProjectTeams {
        #[clap(flatten)]
        project: ProjectName,
    },
    /// Invite user to project
    InviteUser {
        /// Project name
        #[clap(long)]
        project: String,

        /// Username or email
        #[clap(long)]
        user: String,

        /// Access rights
        #[clap(long, value_enum, default_value_t = Rights::Read)]
        rights: Rights,
    },
    /// List available teams
    Teams,
    /// Create new team
    CreateTeam {
        /// Team name
        #[clap(long)]
        name: String,

        /// Team description
        #[clap(long, allow_hyphen_values = true)]
        description: Option<String>,
    },
    /// Share project with team
    ShareProject {
        /// Project name
        #[clap(long)]
        project: String,

        /// Team name
        #[clap(long)]
        team: String,

        /// Access rights
        #[clap(long, value_enum, default_value_t = Rights::Read)]
        rights: Rights,
    },
    /// List projects
    Projects,
    /// Create a project
    CreateProject {
        /// Project name
        #[clap(long)]
        name: Option<String>,
    },
    /// List Kanban stages
    Buckets {
        #[clap(flatten)]
        project: ProjectName,
    },
}

/// Description flags shared by create-task and edit-task.
#[derive(Args, Debug)]
pub struct Description {
    /// Task description (supports multiline)
    #[clap(long, allow_hyphen_values = true)]
    pub description: Option<String>,

    /// Read description from file, overrides --description
    #[clap(long)]
    pub description_file: Option<PathBuf>,

    /// Do not auto-format description to HTML
    #[clap(long)]
    pub no_format: bool,
}

impl Description {
    /// Reads the description text and converts it to HTML unless
    /// `--no-format` was given. Empty descriptions are dropped.
    fn resolve(self) -> anyhow::Result<Option<String>> {
        let text = match self.description_file {
            Some(path) => Some(fs::read_to_string(&path).with_context(|| {
                format!("Failed to read description from {}", path.display())
            })?),
            None => self.description,
        };
        let text = text.filter(|t| !t.is_empty());

        if self.no_format {
            Ok(text)
        } else {
            Ok(format_description(text.as_deref()))
        }
    }
}

#[derive(Args, Debug)]
pub struct TaskId {
    /// Task ID
    #[clap(long)]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TaskLabel {
    /// Task ID
    #[clap(long)]
    pub id: String,

    /// Label name
    #[clap(long)]
    pub label: String,
}

#[derive(Args, Debug)]
pub struct ProjectName {
    /// Project name
    #[clap(long)]
    pub project: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rights {
    Read,
    Write,
    Admin,
}

impl fmt::Display for Rights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rights::Read => "read",
            Rights::Write => "write",
            Rights::Admin => "admin",
        })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        })
    }
}

impl Command {
    /// Maps the command onto the script subcommand and the flags it takes.
    ///
    /// # Errors
    ///
    /// Returns an error if a `--description-file` cannot be read.
    pub fn invocation(self) -> anyhow::Result<Invocation> {
        let invocation = match self {
            Command::CreateTask {
                project,
                title,
                description,
                due,
                priority,
                bucket,
            } => Invocation::new(
                "create-task",
                ArgList::new()
                    .flag("--project", project)
                    .flag("--title", title)
                    .opt("--description", description.resolve()?)
                    .opt("--due", due)
                    .opt("--priority", priority)
                    .opt("--bucket", bucket),
            ),
            Command::EditTask {
                id,
                title,
                description,
                due,
                priority,
            } => Invocation::new(
                "edit-task",
                ArgList::new()
                    .flag("--id", id)
                    .opt("--title", title)
                    .opt("--description", description.resolve()?)
                    .opt("--due", due)
                    .opt("--priority", priority),
            ),
            Command::DeleteTask { task } => Invocation::new("delete-task", task.args()),
            Command::Tasks {
                project,
                count,
                search,
                filter,
                assign,
                sort,
                order,
            } => Invocation::new(
                "tasks",
                ArgList::new()
                    .opt("--project", project)
                    .opt("--count", count)
                    .opt("--search", search)
                    .opt("--filter", filter)
                    .opt("--assign", assign)
                    .opt("--sort", sort)
                    .opt("--order", order),
            ),
            Command::Search { query } => {
                Invocation::new("search", ArgList::new().flag("--query", query))
            }
            Command::Overdue { project } => {
                Invocation::new("overdue", ArgList::new().opt("--project", project))
            }
            Command::Due { hours, project } => Invocation::new(
                "due",
                ArgList::new()
                    .opt("--hours", hours)
                    .opt("--project", project),
            ),
            Command::Complete { task } => Invocation::new("complete", task.args()),
            Command::MoveTask {
                id,
                bucket,
                project,
            } => Invocation::new(
                "move-task",
                ArgList::new()
                    .flag("--id", id)
                    .flag("--bucket", bucket)
                    .opt("--project", project),
            ),
            Command::AssignTask { id, user } => Invocation::new(
                "assign-task",
                ArgList::new().flag("--id", id).flag("--user", user),
            ),
            Command::Task { task } => Invocation::new("task", task.args()),
            Command::Labels => Invocation::new("labels", ArgList::new()),
            Command::AddLabel { label } => Invocation::new("add-label", label.args()),
            Command::RemoveLabel { label } => Invocation::new("remove-label", label.args()),
            Command::Comments { task } => Invocation::new("comments", task.args()),
            Command::AddComment { id, comment } => Invocation::new(
                "add-comment",
                ArgList::new().flag("--id", id).flag("--comment", comment),
            ),
            Command::Users { project } => Invocation::new("users", project.args()),
            Command::ProjectTeams { project } => {
                Invocation::new("project-teams", project.args())
            }
            Command::InviteUser {
                project,
                user,
                rights,
            } => Invocation::new(
                "invite-user",
                ArgList::new()
                    .flag("--project", project)
                    .flag("--user", user)
                    .flag("--rights", rights),
            ),
            Command::Teams => Invocation::new("teams", ArgList::new()),
            Command::CreateTeam { name, description } => Invocation::new(
                "create-team",
                ArgList::new()
                    .flag("--name", name)
                    .opt("--description", description),
            ),
            Command::ShareProject {
                project,
                team,
                rights,
            } => Invocation::new(
                "share-project",
                ArgList::new()
                    .flag("--project", project)
                    .flag("--team", team)
                    .flag("--rights", rights),
            ),
            Command::Projects => Invocation::new("projects", ArgList::new()),
            Command::CreateProject { name } => {
                Invocation::new("create-project", ArgList::new().opt("--name", name))
            }
            Command::Buckets { project } => Invocation::new("buckets", project.args()),
        };
        Ok(invocation)
    }
}

impl TaskId {
    fn args(self) -> ArgList {
        ArgList::new().flag("--id", self.id)
    }
}

impl TaskLabel {
    fn args(self) -> ArgList {
        ArgList::new()
            .flag("--id", self.id)
            .flag("--label", self.label)
    }
}

impl ProjectName {
    fn args(self) -> ArgList {
        ArgList::new().flag("--project", self.project)
    }
}

impl Vikunja {
    /// Runs the selected command through the client script and relays its
    /// output. The returned exit code is the script's own.
    ///
    /// # Errors
    ///
    /// Returns an error if the description file, the credentials or the
    /// script cannot be found or read, or the script cannot be started.
    pub fn exec(self) -> anyhow::Result<ExitCode> {
        let level = if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        // already initialised when called more than once in-process
        let _ = env_logger::Builder::new().filter_level(level).try_init();

        let invocation = self.command.invocation()?;
        let credentials = Credentials::load()?;
        log::debug!("Using {:?}", credentials);

        let script = Script::locate()?;
        log::debug!("Using script {}", script.path().display());
        let output = script.run(&credentials, &invocation)?;
        Ok(script::relay(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn invocation(args: &[&str]) -> Invocation {
        let cli = Vikunja::try_parse_from(std::iter::once("vikunja").chain(args.iter().copied()))
            .unwrap();
        cli.command.invocation().unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Vikunja::command().debug_assert();
    }

    #[test]
    fn test_create_task_formats_description() {
        let inv = invocation(&[
            "create-task",
            "--project",
            "WORK",
            "--title",
            "Ship it",
            "--description",
            "STEPS:\n- build\n- test",
            "--priority",
            "4",
            "--stage",
            "Doing",
        ]);
        assert_eq!(inv.subcommand, "create-task");
        assert_eq!(
            inv.args.as_slice(),
            [
                "--project",
                "WORK",
                "--title",
                "Ship it",
                "--description",
                "<strong>STEPS:</strong><br>\n<ul>\n<li>build</li>\n<li>test</li>\n</ul>",
                "--priority",
                "4",
                "--bucket",
                "Doing",
            ]
        );
    }

    #[test]
    fn test_create_task_no_format() {
        let inv = invocation(&[
            "create-task",
            "--project",
            "WORK",
            "--title",
            "t",
            "--description",
            "- raw",
            "--no-format",
        ]);
        assert_eq!(
            inv.args.as_slice(),
            ["--project", "WORK", "--title", "t", "--description", "- raw"]
        );
    }

    #[test]
    fn test_empty_description_is_dropped() {
        let inv = invocation(&[
            "create-task",
            "--project",
            "WORK",
            "--title",
            "t",
            "--description",
            "",
        ]);
        assert_eq!(inv.args.as_slice(), ["--project", "WORK", "--title", "t"]);
    }

    #[test]
    fn test_description_file_overrides_description() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("desc.txt");
        fs::write(&path, "from file").unwrap();

        let inv = invocation(&[
            "edit-task",
            "--id",
            "9",
            "--description",
            "from flag",
            "--description-file",
            path.to_str().unwrap(),
        ]);
        assert_eq!(inv.subcommand, "edit-task");
        assert_eq!(
            inv.args.as_slice(),
            ["--id", "9", "--description", "from file<br>"]
        );
    }

    #[test]
    fn test_missing_description_file() {
        let cli = Vikunja::try_parse_from([
            "vikunja",
            "create-task",
            "--project",
            "WORK",
            "--title",
            "t",
            "--description-file",
            "/definitely/not/here.txt",
        ])
        .unwrap();
        let err = cli.command.invocation().unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }

    #[test]
    fn test_required_flags_are_usage_errors() {
        let err = Vikunja::try_parse_from(["vikunja", "create-task", "--project", "WORK"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Vikunja::try_parse_from(["vikunja", "move-task", "--id", "1"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_priority_out_of_range() {
        let err = Vikunja::try_parse_from([
            "vikunja",
            "create-task",
            "--project",
            "WORK",
            "--title",
            "t",
            "--priority",
            "6",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_tasks_forwards_filters() {
        let inv = invocation(&[
            "tasks",
            "--project",
            "PERSONAL",
            "--count",
            "10",
            "--assignee",
            "john",
            "--order",
            "desc",
        ]);
        assert_eq!(
            inv.args.as_slice(),
            [
                "--project",
                "PERSONAL",
                "--count",
                "10",
                "--assign",
                "john",
                "--order",
                "desc"
            ]
        );
    }

    #[test]
    fn test_rights_default_to_read() {
        let inv = invocation(&["invite-user", "--project", "WORK", "--user", "maria"]);
        assert_eq!(
            inv.args.as_slice(),
            ["--project", "WORK", "--user", "maria", "--rights", "read"]
        );

        let inv = invocation(&[
            "share-project",
            "--project",
            "WORK",
            "--team",
            "core",
            "--rights",
            "admin",
        ]);
        assert_eq!(
            inv.args.as_slice(),
            ["--project", "WORK", "--team", "core", "--rights", "admin"]
        );
    }

    #[test]
    fn test_create_team_description_is_not_formatted() {
        let inv = invocation(&["create-team", "--name", "core", "--description", "- a"]);
        assert_eq!(
            inv.args.as_slice(),
            ["--name", "core", "--description", "- a"]
        );
    }

    #[test]
    fn test_commands_without_flags() {
        for name in ["labels", "teams", "projects", "create-project"] {
            let inv = invocation(&[name]);
            assert_eq!(inv.subcommand, name);
            assert!(inv.args.as_slice().is_empty());
        }
    }

    #[test]
    fn test_label_commands() {
        let inv = invocation(&["remove-label", "--id", "3", "--label", "urgent"]);
        assert_eq!(inv.subcommand, "remove-label");
        assert_eq!(inv.args.as_slice(), ["--id", "3", "--label", "urgent"]);
    }
}
