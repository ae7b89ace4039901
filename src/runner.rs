//! The dnsR deployment: a fixed, ordered plan run through the engine
//!
//! Order matters: the package before its service, the directory before the
//! drop-in written into it, the unit file before the unit is enabled, and the
//! resolver restart last so it picks up the new drop-in.

use anyhow::Result;
use declarative::{
    ConvergeError, ExecutionReport, Host, NoProgress, Operation, PlannedOperation,
    ProgressCallback, Service, execute, plan,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;

use crate::config::{Deployment, ZONE_FILE};
use crate::ui;

/// How a run presents itself
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Plan and display only
    pub dry_run: bool,
    /// Machine-readable output on stdout instead of the console UI
    pub json: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Systemd unit for the daemon
pub fn render_unit(deployment: &Deployment) -> String {
    format!(
        "[Unit]\n\
         Description={name}\n\
         After=network.target\n\
         \n\
         [Service]\n\
         ExecStart={exec}\n\
         WorkingDirectory={workdir}\n\
         Restart=on-failure\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        name = deployment.service_name,
        exec = deployment.daemon_path().display(),
        workdir = deployment.deploy_dir.display(),
    )
}

/// Lines appended to the resolver drop-in, in order
pub fn resolve_stanza(deployment: &Deployment) -> [String; 3] {
    [
        "[Resolve]".to_string(),
        format!("DNS={}", deployment.listen_address),
        format!("Domains=~{}", deployment.domain_suffix),
    ]
}

/// The operations that provision the daemon and route its domain
pub fn deployment_plan(deployment: &Deployment) -> Vec<Operation> {
    let resolver = deployment.resolver_service.as_str();
    let dropin = deployment.dropin_path();

    let mut ops = vec![
        Operation::package(&deployment.resolver_package),
        Operation::service(Service::new(resolver).running(true).enabled(true)),
        Operation::directory(&deployment.dropin_dir),
        Operation::file(deployment.unit_path(), render_unit(deployment)),
        Operation::service(
            Service::new(&deployment.service_name)
                .running(true)
                .enabled(true),
        ),
    ];
    ops.extend(
        resolve_stanza(deployment)
            .into_iter()
            .map(|line| Operation::line(&dropin, line)),
    );
    ops.push(Operation::service(Service::new(resolver).restarted()));
    ops
}

/// Problems with the deployment directory that will not stop provisioning
/// but will stop the daemon from serving
pub fn preflight(deployment: &Deployment) -> Vec<String> {
    let mut findings = Vec::new();
    let daemon = deployment.daemon_path();

    match fs::metadata(&daemon) {
        Ok(meta) if !meta.is_file() => {
            findings.push(format!("{} is not a file", daemon.display()));
        }
        Ok(meta) if meta.permissions().mode() & 0o111 == 0 => {
            findings.push(format!("{} is not executable", daemon.display()));
        }
        Ok(_) => {}
        Err(_) => findings.push(format!(
            "daemon binary not found at {} (build it with `cargo build --release`)",
            daemon.display()
        )),
    }

    let zone = deployment.deploy_dir.join(ZONE_FILE);
    if !zone.is_file() {
        findings.push(format!(
            "{} not found; the daemon loads it from its working directory",
            zone.display()
        ));
    }

    findings
}

/// Plan and execute the deployment against `host`
pub fn converge<P: ProgressCallback + ?Sized>(
    deployment: &Deployment,
    host: &dyn Host,
    progress: &mut P,
) -> Result<ExecutionReport, ConvergeError> {
    let planned = plan(&deployment_plan(deployment), host)?;
    Ok(execute(planned, host, progress))
}

pub fn run(deployment: &Deployment, host: &dyn Host, opts: RunOptions) -> Result<()> {
    for finding in preflight(deployment) {
        log::warn!("{finding}");
    }

    let planned = plan(&deployment_plan(deployment), host)?;

    if opts.dry_run {
        if opts.json {
            println!("{}", serde_json::to_string_pretty(&planned)?);
        } else {
            show_plan(deployment, &planned, opts.verbose);
            println!();
            ui::info("Dry run - no changes made");
        }
        return Ok(());
    }

    let report = if opts.json {
        let report = execute(planned, host, &mut NoProgress);
        println!("{}", serde_json::to_string_pretty(&report)?);
        report
    } else {
        if !opts.quiet {
            show_plan(deployment, &planned, opts.verbose);
        }
        let report = execute(planned, host, &mut ui::ConsoleProgress::new(opts.quiet));
        if !opts.quiet {
            ui::print_summary(&report);
        }
        report
    };

    report.into_result()?;
    Ok(())
}

fn show_plan(deployment: &Deployment, planned: &[PlannedOperation], verbose: bool) {
    ui::header(&format!("Provisioning {}", deployment.service_name));
    ui::kv("Daemon", &deployment.daemon_path().display().to_string());
    ui::kv("Listen", &deployment.listen_address.to_string());
    ui::kv("Domain", &deployment.domain_suffix);
    ui::kv("Drop-in", &deployment.dropin_path().display().to_string());
    ui::display_plan(planned, verbose);
}
