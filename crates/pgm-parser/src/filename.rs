//! Site/imager identifiers carried in PGM filenames.
//!
//! Filenames look like `20140310_0600_gill_themis19_full.pgm.gz`. Some archived
//! files carry comment blocks that disagree with their filename; the filename
//! is authoritative for the site and imager identifiers.

use imager_common::PgmMeta;
use tracing::{debug, warn};

/// Identifiers parsed from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameIds {
    pub site_uid: String,
    pub device_uid: String,
}

/// Outcome of reconciling comment identifiers with the filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdReconciliation {
    /// Comments and filename agree.
    Agreed,
    /// Comments disagreed (or were blank) and were replaced.
    Overridden { site_uid: String, device_uid: String },
    /// The filename has too few tokens; comment values kept.
    NoFilenameIds,
}

/// Parse `DATE_TIME_SITE_DEVICE_...`; needs at least four `_` tokens.
pub fn ids_from_filename(filename: &str) -> Option<FilenameIds> {
    let tokens: Vec<&str> = filename.split('_').collect();
    if tokens.len() < 4 {
        return None;
    }
    let device = tokens[3].split('.').next().unwrap_or(tokens[3]);
    if tokens[2].is_empty() || device.is_empty() {
        return None;
    }
    Some(FilenameIds {
        site_uid: tokens[2].to_lowercase(),
        device_uid: device.to_lowercase(),
    })
}

/// Replace comment-derived site/imager identifiers with the filename's.
pub fn reconcile_ids(meta: &mut PgmMeta, filename: &str) -> IdReconciliation {
    let Some(ids) = ids_from_filename(filename) else {
        return IdReconciliation::NoFilenameIds;
    };

    if meta.common.site_uid == ids.site_uid && meta.common.device_uid == ids.device_uid {
        debug!(
            file = filename,
            site_uid = %ids.site_uid,
            device_uid = %ids.device_uid,
            "Comment identifiers match filename"
        );
        return IdReconciliation::Agreed;
    }

    warn!(
        file = filename,
        comment_site_uid = %meta.common.site_uid,
        comment_device_uid = %meta.common.device_uid,
        filename_site_uid = %ids.site_uid,
        filename_device_uid = %ids.device_uid,
        "Comment identifiers disagree with filename, using filename"
    );
    IdReconciliation::Overridden {
        site_uid: std::mem::replace(&mut meta.common.site_uid, ids.site_uid),
        device_uid: std::mem::replace(&mut meta.common.device_uid, ids.device_uid),
    }
}
