use anyhow::{Context, Result};
use itertools::Itertools;

use viewsort::organize::config::{DEFAULT_GROUP_NAME, DEFAULT_SIDE_KEYWORD, DEFAULT_VENTRAL_KEYWORD};
use viewsort::organize::{ContextMode, DelimiterPair, OrganizeConfig, TransferMode, ViewsortConfig};

use crate::Args;

/// Create config from given command line args and user config file.
pub fn from_args(args: Args) -> Result<OrganizeConfig> {
    let user_config = ViewsortConfig::get_user_config()?;
    from_args_and_user_config(args, user_config)
}

/// Combine CLI arguments with the user config.
///
/// Booleans are enabled by either source, lists are combined,
/// and CLI values override config values.
fn from_args_and_user_config(args: Args, user_config: ViewsortConfig) -> Result<OrganizeConfig> {
    let target = args
        .target
        .or(user_config.target)
        .context("Target directory is required: use --target or set `target` in the [viewsort] config")?;
    let target_root = viewsort::resolve_output_path(&target)?;

    let left = args
        .left
        .or(user_config.left_delimiter)
        .context("Left delimiter is required: use --left or set `left_delimiter` in the [viewsort] config")?;
    let right = args
        .right
        .or(user_config.right_delimiter)
        .context("Right delimiter is required: use --right or set `right_delimiter` in the [viewsort] config")?;

    let context = select_context(
        (args.group, args.timepoint),
        pair_from_values(&args.group_delimiters),
        pair_from_values(&args.timepoint_delimiters),
        (user_config.group, user_config.timepoint),
        user_config.group_delimiters.map(|(left, right)| DelimiterPair::new(left, right)),
        user_config.timepoint_delimiters.map(|(left, right)| DelimiterPair::new(left, right)),
    )?;

    let recurse = args.recurse || user_config.recurse || context == ContextMode::Folders;

    let extensions = OrganizeConfig::normalize_extensions(
        user_config.extensions.into_iter().chain(args.extension).collect(),
    );
    let include: Vec<String> = user_config.include.into_iter().chain(args.include).unique().collect();
    let exclude: Vec<String> = user_config.exclude.into_iter().chain(args.exclude).unique().collect();

    let mode = if args.move_files || user_config.move_files {
        TransferMode::Move
    } else {
        TransferMode::Copy
    };

    Ok(OrganizeConfig {
        side_keyword: args
            .side
            .or(user_config.side_keyword)
            .unwrap_or_else(|| DEFAULT_SIDE_KEYWORD.to_string()),
        ventral_keyword: args
            .ventral
            .or(user_config.ventral_keyword)
            .unwrap_or_else(|| DEFAULT_VENTRAL_KEYWORD.to_string()),
        case_sensitive: !(args.ignore_case || user_config.ignore_case),
        delimiters: DelimiterPair::new(left, right),
        regex_delimiters: args.regex || user_config.regex,
        context,
        default_group: args
            .default_group
            .or(user_config.default_group)
            .unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string()),
        target_root,
        extensions,
        include,
        exclude,
        mode,
        require_ventral: args.require_ventral || user_config.require_ventral,
        require_video: args.require_video || user_config.require_video,
        recurse,
        dryrun: args.print || user_config.dryrun,
        log: args.log || user_config.log,
        report_path: args.report,
        debug: args.debug || user_config.debug,
        verbose: args.verbose || user_config.verbose,
    })
}

/// Collect a `LEFT RIGHT` argument pair.
fn pair_from_values(values: &[String]) -> Option<DelimiterPair> {
    match values {
        [left, right] => Some(DelimiterPair::new(left.as_str(), right.as_str())),
        _ => None,
    }
}

/// Pick the group context mode.
///
/// CLI options win over the config file, fixed names win over delimiters,
/// and without either the enclosing folders are used.
fn select_context(
    cli_fixed: (Option<String>, Option<String>),
    cli_group_delimiters: Option<DelimiterPair>,
    cli_timepoint_delimiters: Option<DelimiterPair>,
    config_fixed: (Option<String>, Option<String>),
    config_group_delimiters: Option<DelimiterPair>,
    config_timepoint_delimiters: Option<DelimiterPair>,
) -> Result<ContextMode> {
    if let (Some(group), Some(timepoint)) = cli_fixed {
        return Ok(ContextMode::Fixed { group, timepoint });
    }
    if let Some(timepoint) = cli_timepoint_delimiters {
        return Ok(ContextMode::Delimiters {
            group: cli_group_delimiters,
            timepoint,
        });
    }
    match config_fixed {
        (Some(group), Some(timepoint)) => return Ok(ContextMode::Fixed { group, timepoint }),
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("Both `group` and `timepoint` must be set in the [viewsort] config")
        }
        (None, None) => {}
    }
    match (config_group_delimiters, config_timepoint_delimiters) {
        (group, Some(timepoint)) => Ok(ContextMode::Delimiters { group, timepoint }),
        (Some(_), None) => {
            anyhow::bail!("`group_delimiters` requires `timepoint_delimiters` in the [viewsort] config")
        }
        (None, None) => Ok(ContextMode::Folders),
    }
}
