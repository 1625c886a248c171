//! rtsync link attach|detach

use super::{block_on, Context, LinkArgs};
use crate::error::Result;
use crate::links::{LinkChange, LinkOp, LinkSynchronizer};
use crate::output::{emit_success, HumanOutput};

pub struct LinkOptions {
    pub change: LinkChange,
    pub no_mirror: bool,
}

impl LinkOptions {
    pub fn from_args(args: LinkArgs, op: LinkOp) -> Self {
        Self {
            change: LinkChange::new(args.parent, args.child, args.kind, op).clobber(args.clobber),
            no_mirror: args.no_mirror,
        }
    }
}

pub fn run(context: &Context, options: LinkOptions) -> Result<()> {
    let gateway = context.gateway()?;
    let mirror = context.mirror();
    let use_mirror = context.config.links.update_mirror && !options.no_mirror;

    let mut synchronizer =
        LinkSynchronizer::new(&gateway).allow_self_link(context.config.links.allow_self_link);
    if use_mirror {
        synchronizer = synchronizer.with_mirror(&mirror);
    }
    let outcome = block_on(synchronizer.run(&options.change))?;

    let change = &options.change;
    let verb = match change.op {
        LinkOp::Attach => "Attached",
        LinkOp::Detach => "Detached",
    };
    let mut human = HumanOutput::new(format!(
        "{verb} {} link #{} -> #{}",
        change.kind, change.parent, change.child
    ));
    human.push_summary(
        format!("#{}", outcome.plan.parent),
        outcome.plan.parent_payload(),
    );
    human.push_summary(
        format!("#{}", outcome.plan.child),
        outcome.plan.child_payload(),
    );
    if !outcome.mirror_updated {
        human.push_detail("mirror not updated");
    }
    for missing in &outcome.mirror_missing {
        human.push_warning(format!("ticket #{missing} is not in the mirror"));
        human.push_next_step(format!("rtsync pull {missing}"));
    }

    let command = format!("link {}", change.op.as_str());
    emit_success(context.output, &command, &outcome, Some(&human))
}
