//! Numeric identifier allocation and validation.
//!
//! User and group ids live in two independent spaces, each a set of
//! integers in `[10000, 60000)`. Allocation is a full scan of the space:
//! there is no cached high-water mark, so correctness depends on the
//! session lock held by the calling manager for the whole
//! scan-then-mutate sequence. Separate processes can still race; the
//! directory itself does not arbitrate.

use crate::config::DirectoryConfig;
use crate::session::DirectorySession;
use crate::Result;
use posixdir_core::Error;

/// Lowest identifier ever handed out is `ID_FLOOR + 1`.
pub const ID_FLOOR: i64 = 10_000;
/// Identifiers at or above this value are never allocated.
pub const ID_CEILING: i64 = 60_000;

/// The two independent identifier spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpace {
    /// POSIX account uid numbers.
    User,
    /// POSIX group gid numbers.
    Group,
}

impl IdSpace {
    /// Directory attribute holding the numeric identifier.
    #[must_use]
    pub const fn attribute(&self) -> &'static str {
        match self {
            Self::User => "uidNumber",
            Self::Group => "gidNumber",
        }
    }

    /// Filter matching every entry of the space that carries an identifier.
    #[must_use]
    pub const fn scan_filter(&self) -> &'static str {
        match self {
            Self::User => "(&(uidNumber=*)(objectClass=posixAccount))",
            Self::Group => "(&(gidNumber=*)(objectClass=posixGroup))",
        }
    }

    /// Short label used in error messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::User => "uid",
            Self::Group => "gid",
        }
    }
}

/// Computes the next free identifier for the space.
///
/// Scans every entry of the space and returns one past the highest
/// identifier observed inside the allocation range; an empty space (or one
/// whose ids all fall outside the range) yields `10001`.
///
/// # Errors
///
/// Returns [`Error::IdParse`] if an existing identifier attribute is not
/// an integer; the space is considered corrupt and no allocation is made.
pub async fn next_id(
    session: &mut DirectorySession,
    config: &DirectoryConfig,
    space: IdSpace,
) -> Result<String> {
    let entries = session
        .search(config.base_dn().as_str(), space.scan_filter(), &[])
        .await?;

    let mut highest = ID_FLOOR;
    for entry in &entries {
        let value = parse_entry_id(space, entry.first_or_empty(space.attribute()), &entry.dn)?;
        if value > highest && value < ID_CEILING {
            highest = value;
        }
    }

    Ok((highest + 1).to_string())
}

/// Validates a caller-supplied identifier against the space.
///
/// # Errors
///
/// Returns [`Error::IdFormat`] when `id` is not an integer,
/// [`Error::IdOutOfRange`] when it falls outside `[10000, 60000)`, and
/// [`Error::IdConflict`] when it is already attached to a live entry.
pub async fn verify_id(
    session: &mut DirectorySession,
    config: &DirectoryConfig,
    space: IdSpace,
    id: &str,
) -> Result<()> {
    let value: i64 = id
        .trim()
        .parse()
        .map_err(|_| Error::IdFormat(format!("{} `{id}` is not an integer", space.label())))?;

    if !(ID_FLOOR..ID_CEILING).contains(&value) {
        return Err(Error::IdOutOfRange(value));
    }

    let canonical = value.to_string();
    let entries = session
        .search(config.base_dn().as_str(), space.scan_filter(), &[])
        .await?;
    for entry in &entries {
        if entry.first_or_empty(space.attribute()).trim() == canonical {
            return Err(Error::IdConflict(format!(
                "{} {canonical} already assigned",
                space.label()
            )));
        }
    }

    Ok(())
}

fn parse_entry_id(space: IdSpace, raw: &str, dn: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| {
        Error::IdParse(format!(
            "{} attribute `{raw}` on {dn} is not an integer",
            space.attribute()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{admin_handle, config, entry, offline_session, session_with};

    fn user_entry(uid: &str) -> crate::session::LdapEntry {
        entry(
            &format!("uid=u{uid},ou=People,dc=example,dc=com"),
            &[("uidNumber", &[uid])],
        )
    }

    #[tokio::test]
    async fn empty_space_allocates_10001() {
        let mut handle = admin_handle();
        handle.expect_search().returning(|_, _, _| Ok(Vec::new()));
        let mut session = session_with(handle);

        let id = next_id(&mut session, &config(), IdSpace::User).await.unwrap();
        assert_eq!(id, "10001");
    }

    #[tokio::test]
    async fn allocates_one_past_highest_in_range() {
        let mut handle = admin_handle();
        handle.expect_search().returning(|_, _, _| {
            Ok(vec![
                user_entry("10500"),
                user_entry("9999"),
                user_entry("70000"),
                user_entry("10044"),
            ])
        });
        let mut session = session_with(handle);

        let id = next_id(&mut session, &config(), IdSpace::User).await.unwrap();
        assert_eq!(id, "10501");
    }

    #[tokio::test]
    async fn out_of_range_ids_only_allocates_10001() {
        let mut handle = admin_handle();
        handle
            .expect_search()
            .returning(|_, _, _| Ok(vec![user_entry("60000"), user_entry("9000")]));
        let mut session = session_with(handle);

        let id = next_id(&mut session, &config(), IdSpace::Group)
            .await
            .unwrap();
        assert_eq!(id, "10001");
    }

    #[tokio::test]
    async fn corrupt_identifier_is_fatal() {
        let mut handle = admin_handle();
        handle
            .expect_search()
            .returning(|_, _, _| Ok(vec![user_entry("not-a-number")]));
        let mut session = session_with(handle);

        let err = next_id(&mut session, &config(), IdSpace::User)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdParse(_)));
    }

    #[tokio::test]
    async fn verify_rejects_non_integer_without_contacting_directory() {
        let mut session = offline_session();
        let err = verify_id(&mut session, &config(), IdSpace::User, "12a45")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdFormat(_)));
    }

    #[tokio::test]
    async fn verify_range_boundaries() {
        let mut session = offline_session();
        for id in ["9999", "60000", "-5"] {
            let err = verify_id(&mut session, &config(), IdSpace::Group, id)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::IdOutOfRange(_)), "id {id}");
        }

        let mut handle = admin_handle();
        handle.expect_search().returning(|_, _, _| Ok(Vec::new()));
        let mut session = session_with(handle);
        verify_id(&mut session, &config(), IdSpace::Group, "10000")
            .await
            .unwrap();

        let mut handle = admin_handle();
        handle.expect_search().returning(|_, _, _| Ok(Vec::new()));
        let mut session = session_with(handle);
        verify_id(&mut session, &config(), IdSpace::Group, "59999")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_detects_conflict() {
        let mut handle = admin_handle();
        handle
            .expect_search()
            .returning(|_, _, _| Ok(vec![user_entry("10005")]));
        let mut session = session_with(handle);

        let err = verify_id(&mut session, &config(), IdSpace::User, "10005")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdConflict(_)));
    }

    #[tokio::test]
    async fn verify_passes_free_id() {
        let mut handle = admin_handle();
        handle
            .expect_search()
            .returning(|_, _, _| Ok(vec![user_entry("10005")]));
        let mut session = session_with(handle);

        verify_id(&mut session, &config(), IdSpace::User, "10006")
            .await
            .unwrap();
    }
}
