//! The deployment operations. Each one checks its arguments, resolves the
//! machine, then runs a fixed sequence of remote steps; the first failure
//! aborts the rest and nothing is rolled back.

use std::future::Future;
use std::time::Instant;

use fleet::{FleetApi, FleetResolver, RemoteTarget};
use tracing::{info, warn};

use crate::archive::{ArchiveProducer, SourceControl};
use crate::error::{DeployError, DeployResult};
use crate::image::ImageRef;
use crate::remote::{ExecMode, RemoteCommand, RemoteShell};

/// Port the container listens on, published on the host's 443.
const CONTAINER_PORT_MAPPING: &str = "443:10443";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Load,
    Loaded,
    Build,
    Built,
    Up,
    Down,
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Operation {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Loaded => "loaded",
            Self::Build => "build",
            Self::Built => "built",
            Self::Up => "up",
            Self::Down => "down",
            Self::Status => "status",
        }
    }

    pub(crate) fn usage(self) -> &'static str {
        match self {
            Self::Load => "<machine name> <tag>",
            Self::Loaded | Self::Built | Self::Status => "<machine name>",
            Self::Build => "<machine name> <docker file> <repo>/<image name>:<tag>",
            Self::Up => "<machine name> <repo>/<image name>:<tag> <command>...",
            Self::Down => "<machine name> <container id>",
        }
    }

    fn arity(self) -> Arity {
        match self {
            Self::Loaded | Self::Built | Self::Status => Arity::Exactly(1),
            Self::Load | Self::Down => Arity::Exactly(2),
            Self::Build => Arity::Exactly(3),
            Self::Up => Arity::AtLeast(3),
        }
    }

    fn check_args(self, args: &[String]) -> DeployResult<()> {
        let (ok, expected) = match self.arity() {
            Arity::Exactly(1) => (args.len() == 1, "1 argument".to_string()),
            Arity::Exactly(count) => (args.len() == count, format!("{count} arguments")),
            Arity::AtLeast(count) => (args.len() >= count, format!("at least {count} arguments")),
        };
        if ok {
            return Ok(());
        }
        Err(DeployError::InvalidArguments {
            command: self.name(),
            expected,
            got: args.len(),
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    /// Remote output to show the user, for operations that capture it.
    pub(crate) output: Option<String>,
}

pub(crate) struct Workflow<A, S, V> {
    resolver: FleetResolver<A>,
    shell: S,
    archives: ArchiveProducer<V>,
}

impl<A, S, V> Workflow<A, S, V>
where
    A: FleetApi,
    S: RemoteShell,
    V: SourceControl,
{
    pub(crate) fn new(resolver: FleetResolver<A>, shell: S, archives: ArchiveProducer<V>) -> Self {
        Self {
            resolver,
            shell,
            archives,
        }
    }

    pub(crate) async fn run(&self, operation: Operation, args: &[String]) -> DeployResult<Outcome> {
        operation.check_args(args)?;
        match operation {
            Operation::Load => self.load(&args[0], &args[1]).await,
            Operation::Loaded => self.loaded(&args[0]).await,
            Operation::Build => self.build(&args[0], &args[1], &args[2]).await,
            Operation::Built => self.built(&args[0]).await,
            Operation::Up => self.up(&args[0], &args[1], &args[2..]).await,
            Operation::Down => self.down(&args[0], &args[1]).await,
            Operation::Status => self.status(&args[0]).await,
        }
    }

    /// Archives `tag`, uploads it and unpacks it into a fresh `<repo>-<tag>` folder.
    async fn load(&self, machine: &str, tag: &str) -> DeployResult<Outcome> {
        let archive = traced(machine, "archive", self.archives.produce(tag)).await?;
        let target = self.resolve(machine).await?;
        let file = archive.file_name();
        let folder = archive.folder();

        let remove = RemoteCommand::new("rm").arg("-rf").arg(&file);
        self.remote(&target, "remove_old_archive", remove, ExecMode::Interactive)
            .await?;
        traced(
            machine,
            "copy_archive",
            self.shell.copy(&target, &archive.local_path),
        )
        .await?;

        // Extraction always starts from an empty folder.
        let clear = RemoteCommand::new("rm").arg("-rf").arg(&folder);
        self.remote(&target, "clear_folder", clear, ExecMode::Captured)
            .await?;
        let create = RemoteCommand::new("mkdir").arg(&folder);
        self.remote(&target, "create_folder", create, ExecMode::Captured)
            .await?;
        let untar = RemoteCommand::new("tar")
            .arg("zxvf")
            .arg(&file)
            .arg("-C")
            .arg(&folder);
        self.remote(&target, "extract", untar, ExecMode::Captured)
            .await?;
        Ok(Outcome::default())
    }

    async fn loaded(&self, machine: &str) -> DeployResult<Outcome> {
        let target = self.resolve(machine).await?;
        let list = RemoteCommand::new("ls").arg("-l");
        let output = self
            .remote(&target, "list_home", list, ExecMode::Captured)
            .await?;
        Ok(Outcome { output })
    }

    async fn build(&self, machine: &str, dockerfile: &str, image: &str) -> DeployResult<Outcome> {
        let image = ImageRef::parse(image)?;
        let target = self.resolve(machine).await?;
        let command = RemoteCommand::new("cd")
            .arg(image.folder())
            .and_then("cp")
            .arg(dockerfile)
            .arg(".")
            .and_then("docker")
            .args(["build", "-t"])
            .arg(image.to_string())
            .arg(".");
        self.remote(&target, "docker_build", command, ExecMode::Interactive)
            .await?;
        Ok(Outcome::default())
    }

    async fn built(&self, machine: &str) -> DeployResult<Outcome> {
        let target = self.resolve(machine).await?;
        let images = RemoteCommand::new("docker").arg("images");
        let output = self
            .remote(&target, "docker_images", images, ExecMode::Captured)
            .await?;
        Ok(Outcome { output })
    }

    /// Trailing words are passed through space-joined; quoting is not preserved.
    async fn up(&self, machine: &str, image: &str, command: &[String]) -> DeployResult<Outcome> {
        let image = ImageRef::parse(image)?;
        let target = self.resolve(machine).await?;
        let run = RemoteCommand::new("docker")
            .args(["run", "-d", "-p", CONTAINER_PORT_MAPPING])
            .arg(image.to_string())
            .args(command.iter().cloned());
        let output = self
            .remote(&target, "docker_run", run, ExecMode::Captured)
            .await?;
        Ok(Outcome { output })
    }

    async fn down(&self, machine: &str, container: &str) -> DeployResult<Outcome> {
        let target = self.resolve(machine).await?;
        let kill = RemoteCommand::new("docker").arg("kill").arg(container);
        self.remote(&target, "docker_kill", kill, ExecMode::Interactive)
            .await?;
        Ok(Outcome::default())
    }

    async fn status(&self, machine: &str) -> DeployResult<Outcome> {
        let target = self.resolve(machine).await?;
        let ps = RemoteCommand::new("docker").arg("ps").arg("--no-trunc");
        self.remote(&target, "docker_ps", ps, ExecMode::Interactive)
            .await?;
        Ok(Outcome::default())
    }

    async fn resolve(&self, machine: &str) -> DeployResult<RemoteTarget> {
        traced(machine, "resolve", async {
            self.resolver
                .resolve(machine)
                .await
                .map_err(DeployError::from)
        })
        .await
    }

    async fn remote(
        &self,
        target: &RemoteTarget,
        step: &'static str,
        command: RemoteCommand,
        mode: ExecMode,
    ) -> DeployResult<Option<String>> {
        traced(
            &target.machine_name,
            step,
            self.shell.run(target, &command, mode),
        )
        .await
    }
}

async fn traced<T, Fut>(machine: &str, step: &'static str, fut: Fut) -> DeployResult<T>
where
    Fut: Future<Output = DeployResult<T>>,
{
    info!(event = "step.start", machine, step, "step start");
    let start = Instant::now();
    match fut.await {
        Ok(value) => {
            info!(
                event = "step.done",
                machine,
                step,
                elapsed_ms = start.elapsed().as_millis(),
                "step done"
            );
            Ok(value)
        }
        Err(err) => {
            warn!(
                event = "step.failed",
                machine,
                step,
                elapsed_ms = start.elapsed().as_millis(),
                error = %err,
                "step failed"
            );
            Err(err)
        }
    }
}
