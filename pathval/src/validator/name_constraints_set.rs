//! Structures and functions related to processing name constraints

use alloc::{string::String, vec::Vec};
use core::mem::discriminant;

#[cfg(feature = "std")]
use alloc::string::ToString;

#[cfg(feature = "std")]
use url::Url;

use log::debug;
use x509_cert::ext::pkix::{
    constraints::name::{GeneralSubtree, GeneralSubtrees},
    name::GeneralName,
    SubjectAltName,
};
use x509_cert::name::Name;

use crate::util::pdv_utilities::*;

/// The `NameConstraintsSet` structure is used to track the permitted_subtrees and excluded_subtrees
/// state variables during path validation (see [RFC 5280 Section 6.1]).
///
/// For each supported name form, an empty vector with the corresponding `_null` flag cleared
/// indicates nothing has been set (i.e., no excluded names or unlimited permitted names). A set
/// `_null` flag indicates an intersection operation yielded the empty set, i.e., no names of that
/// form are permitted.
///
/// The not_supported field collects subtrees of forms that are not supported (iPAddress, otherName,
/// x400Address, ediPartyName and registeredID). Names of those forms are treated as outside
/// the permitted subtrees and inside the excluded subtrees when a matching form was collected.
///
/// Instances are not modified once created. Intersection and union operations return new values.
///
/// [RFC 5280 Section 6.1]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1>
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct NameConstraintsSet {
    /// rfc822_name governs use of email addresses in SANs
    pub rfc822_name: Vec<GeneralSubtree>, //t = 1
    /// rfc822_name_null is initialized to false and set to true if an intersection operation yields empty set
    pub rfc822_name_null: bool,
    /// dns_name governs use of DNS names in SANs
    pub dns_name: Vec<GeneralSubtree>, //t = 2
    /// dns_name_null is initialized to false and set to true if an intersection operation yields empty set
    pub dns_name_null: bool,
    /// directory_name governs use of DNs in SANs and subject fields
    pub directory_name: Vec<GeneralSubtree>, //t = 4
    /// directory_name_null is initialized to false and set to true if an intersection operation yields empty set
    pub directory_name_null: bool,
    /// uniform_resource_identifier governs use of URIs in SANs
    pub uniform_resource_identifier: Vec<GeneralSubtree>, //t = 6
    /// uniform_resource_identifier_null is initialized to false and set to true if an intersection operation yields empty set
    pub uniform_resource_identifier_null: bool,
    /// not_supported collects subtrees of unsupported name forms
    pub not_supported: Vec<GeneralSubtree>,
}

/// Supported name forms
#[derive(Clone, Copy, PartialEq, Eq)]
enum NameForm {
    Rfc822,
    Dns,
    Directory,
    Uri,
}

fn name_form(gn: &GeneralName) -> Option<NameForm> {
    match gn {
        GeneralName::Rfc822Name(_) => Some(NameForm::Rfc822),
        GeneralName::DnsName(_) => Some(NameForm::Dns),
        GeneralName::DirectoryName(_) => Some(NameForm::Directory),
        GeneralName::UniformResourceIdentifier(_) => Some(NameForm::Uri),
        _ => None,
    }
}

/// returns the host portion of a URI
fn uri_host(uri: &str) -> Option<String> {
    #[cfg(feature = "std")]
    {
        Url::parse(uri)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }
    #[cfg(not(feature = "std"))]
    {
        debug!("URI host extraction requires the std feature: {}", uri);
        None
    }
}

/// `name_within_subtree` returns true if the name from a certificate is within the subtree
fn name_within_subtree(subtree: &GeneralSubtree, name: &GeneralName) -> bool {
    match (&subtree.base, name) {
        (GeneralName::DirectoryName(base), GeneralName::DirectoryName(name)) => {
            descended_from_dn(base, name, subtree.minimum, subtree.maximum)
        }
        (GeneralName::Rfc822Name(base), GeneralName::Rfc822Name(addr)) => {
            descended_from_rfc822(base.as_str(), addr.as_str())
        }
        (GeneralName::DnsName(base), GeneralName::DnsName(host)) => {
            descended_from_host(base.as_str(), host.as_str(), false)
        }
        (GeneralName::UniformResourceIdentifier(base), GeneralName::UniformResourceIdentifier(uri)) => {
            match uri_host(uri.as_str()) {
                Some(host) => descended_from_host(base.as_str(), host.as_str(), true),
                None => false,
            }
        }
        _ => false,
    }
}

/// `subtree_within_subtree` returns true if every name within inner is also within outer
fn subtree_within_subtree(outer: &GeneralSubtree, inner: &GeneralSubtree) -> bool {
    match (&outer.base, &inner.base) {
        (GeneralName::DirectoryName(o), GeneralName::DirectoryName(i)) => {
            descended_from_dn(o, i, outer.minimum, outer.maximum)
        }
        (GeneralName::Rfc822Name(o), GeneralName::Rfc822Name(i)) => {
            if i.as_str().contains('@') {
                descended_from_rfc822(o.as_str(), i.as_str())
            } else if o.as_str().contains('@') {
                false
            } else {
                descended_from_host(o.as_str(), i.as_str(), true)
            }
        }
        (GeneralName::DnsName(o), GeneralName::DnsName(i)) => {
            descended_from_host(o.as_str(), i.as_str(), false)
        }
        (GeneralName::UniformResourceIdentifier(o), GeneralName::UniformResourceIdentifier(i)) => {
            descended_from_host(o.as_str(), i.as_str(), true)
        }
        _ => false,
    }
}

impl NameConstraintsSet {
    //----------------------------------------------------------------------------
    // public
    //----------------------------------------------------------------------------
    /// `calculate_intersection` returns the intersection of self and the permittedSubtrees from a
    /// NameConstraints extension. Forms that do not appear in ext are left unchanged.
    #[must_use]
    pub fn calculate_intersection(&self, ext: &GeneralSubtrees) -> Self {
        let mut retval = self.clone();
        for form in [NameForm::Rfc822, NameForm::Dns, NameForm::Directory, NameForm::Uri] {
            let new_names: Vec<&GeneralSubtree> = ext
                .iter()
                .filter(|s| name_form(&s.base) == Some(form))
                .collect();
            if new_names.is_empty() {
                continue;
            }

            let (prev, prev_null) = retval.bucket_mut(form);
            if *prev_null {
                continue;
            }
            if prev.is_empty() {
                *prev = new_names.into_iter().cloned().collect();
                continue;
            }

            let mut new_set: Vec<GeneralSubtree> = Vec::new();
            for new_name in &new_names {
                for prev_name in prev.iter() {
                    let narrower = if subtree_within_subtree(prev_name, new_name) {
                        Some(*new_name)
                    } else if subtree_within_subtree(new_name, prev_name) {
                        Some(prev_name)
                    } else {
                        None
                    };
                    if let Some(n) = narrower {
                        if !new_set.contains(n) {
                            new_set.push(n.clone());
                        }
                    }
                }
            }

            if new_set.is_empty() {
                debug!("Intersection of permitted subtrees yielded the empty set");
                prev.clear();
                *prev_null = true;
            } else {
                *prev = new_set;
            }
        }

        for subtree in ext {
            if name_form(&subtree.base).is_none() && !retval.not_supported.contains(subtree) {
                retval.not_supported.push(subtree.clone());
            }
        }
        retval
    }

    /// `calculate_union` returns the union of self and the excludedSubtrees from a NameConstraints
    /// extension.
    #[must_use]
    pub fn calculate_union(&self, ext: &GeneralSubtrees) -> Self {
        let mut retval = self.clone();
        for subtree in ext {
            let bucket = match name_form(&subtree.base) {
                Some(form) => retval.bucket_mut(form).0,
                None => &mut retval.not_supported,
            };
            if !bucket.contains(subtree) {
                bucket.push(subtree.clone());
            }
        }
        retval
    }

    /// `subject_within_permitted_subtrees` returns true if subject is within at least one permitted
    /// subtree known to self or if no directoryName subtrees have been set.
    pub fn subject_within_permitted_subtrees(&self, subject: &Name) -> bool {
        if subject.0.is_empty() {
            // NULL subjects get a free pass
            return true;
        }
        self.within_permitted(&GeneralName::DirectoryName(subject.clone()))
    }

    /// `subject_within_excluded_subtrees` returns true if subject is within at least one excluded subtree
    /// known to self.
    pub fn subject_within_excluded_subtrees(&self, subject: &Name) -> bool {
        if subject.0.is_empty() {
            return false;
        }
        self.within_excluded(&GeneralName::DirectoryName(subject.clone()))
    }

    /// `subject_email_within_permitted_subtrees` returns true if every emailAddress attribute in
    /// subject is within the permitted rfc822Name subtrees known to self. RFC 5280 Section 4.2.1.10
    /// applies rfc822Name constraints to these attributes when a certificate has no SAN.
    pub fn subject_email_within_permitted_subtrees(&self, subject: &Name) -> bool {
        email_addresses_in_name(subject)
            .into_iter()
            .all(|addr| self.within_permitted(&GeneralName::Rfc822Name(addr)))
    }

    /// `subject_email_within_excluded_subtrees` returns true if any emailAddress attribute in subject
    /// is within at least one excluded rfc822Name subtree known to self.
    pub fn subject_email_within_excluded_subtrees(&self, subject: &Name) -> bool {
        email_addresses_in_name(subject)
            .into_iter()
            .any(|addr| self.within_excluded(&GeneralName::Rfc822Name(addr)))
    }

    /// `san_within_permitted_subtrees` returns true if every name in san is within the permitted
    /// subtrees known to self for its name form.
    pub fn san_within_permitted_subtrees(&self, san: Option<&SubjectAltName>) -> bool {
        match san {
            Some(san) => san.0.iter().all(|gn| self.within_permitted(gn)),
            None => true,
        }
    }

    /// `san_within_excluded_subtrees` returns true if any name in san is within at least one excluded
    /// subtree known to self.
    pub fn san_within_excluded_subtrees(&self, san: Option<&SubjectAltName>) -> bool {
        match san {
            Some(san) => san.0.iter().any(|gn| self.within_excluded(gn)),
            None => false,
        }
    }

    //----------------------------------------------------------------------------
    // private
    //----------------------------------------------------------------------------
    fn bucket(&self, form: NameForm) -> (&Vec<GeneralSubtree>, bool) {
        match form {
            NameForm::Rfc822 => (&self.rfc822_name, self.rfc822_name_null),
            NameForm::Dns => (&self.dns_name, self.dns_name_null),
            NameForm::Directory => (&self.directory_name, self.directory_name_null),
            NameForm::Uri => (
                &self.uniform_resource_identifier,
                self.uniform_resource_identifier_null,
            ),
        }
    }

    fn bucket_mut(&mut self, form: NameForm) -> (&mut Vec<GeneralSubtree>, &mut bool) {
        match form {
            NameForm::Rfc822 => (&mut self.rfc822_name, &mut self.rfc822_name_null),
            NameForm::Dns => (&mut self.dns_name, &mut self.dns_name_null),
            NameForm::Directory => (&mut self.directory_name, &mut self.directory_name_null),
            NameForm::Uri => (
                &mut self.uniform_resource_identifier,
                &mut self.uniform_resource_identifier_null,
            ),
        }
    }

    fn unsupported_form_collected(&self, gn: &GeneralName) -> bool {
        self.not_supported
            .iter()
            .any(|ns| discriminant(&ns.base) == discriminant(gn))
    }

    fn within_permitted(&self, gn: &GeneralName) -> bool {
        match name_form(gn) {
            Some(form) => {
                let (subtrees, null) = self.bucket(form);
                if null {
                    return false;
                }
                subtrees.is_empty() || subtrees.iter().any(|s| name_within_subtree(s, gn))
            }
            None => !self.unsupported_form_collected(gn),
        }
    }

    fn within_excluded(&self, gn: &GeneralName) -> bool {
        match name_form(gn) {
            Some(NameForm::Uri) => {
                let (subtrees, _) = self.bucket(NameForm::Uri);
                if subtrees.is_empty() {
                    return false;
                }
                if let GeneralName::UniformResourceIdentifier(uri) = gn {
                    if uri_host(uri.as_str()).is_none() {
                        // cannot show the name is outside the excluded subtrees
                        return true;
                    }
                }
                subtrees.iter().any(|s| name_within_subtree(s, gn))
            }
            Some(form) => self
                .bucket(form)
                .0
                .iter()
                .any(|s| name_within_subtree(s, gn)),
            None => self.unsupported_form_collected(gn),
        }
    }
}
