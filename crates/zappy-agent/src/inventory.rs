//! Inventory operations for agents.
//!
//! Stones are kept in a `BTreeMap<ResourceKind, u32>`; a missing key means
//! zero. Every mutation uses checked arithmetic -- no silent overflows, no
//! panics.

use std::collections::BTreeMap;

use zappy_types::ResourceKind;

use crate::error::AgentError;

/// Quantity of `resource` held, zero when absent.
pub fn quantity(inventory: &BTreeMap<ResourceKind, u32>, resource: ResourceKind) -> u32 {
    inventory.get(&resource).copied().unwrap_or(0)
}

/// Check whether the inventory contains at least `amount` of the given resource.
pub fn has_resource(inventory: &BTreeMap<ResourceKind, u32>, resource: ResourceKind, amount: u32) -> bool {
    quantity(inventory, resource) >= amount
}

/// Add `amount` units of `resource` to the inventory.
pub fn add_resource(
    inventory: &mut BTreeMap<ResourceKind, u32>,
    resource: ResourceKind,
    amount: u32,
) -> Result<(), AgentError> {
    let entry = inventory.entry(resource).or_insert(0);
    *entry = entry.checked_add(amount).ok_or_else(|| AgentError::ArithmeticOverflow {
        context: format!("adding {amount} {resource} to inventory"),
    })?;
    Ok(())
}

/// Remove `amount` units of `resource` from the inventory.
///
/// Fails if the agent does not hold enough of the resource. Removes the key
/// entirely if quantity reaches zero.
pub fn remove_resource(
    inventory: &mut BTreeMap<ResourceKind, u32>,
    resource: ResourceKind,
    amount: u32,
) -> Result<(), AgentError> {
    let current = quantity(inventory, resource);

    let remaining = current.checked_sub(amount).ok_or(AgentError::InsufficientResource {
        resource,
        requested: amount,
        available: current,
    })?;

    if remaining == 0 {
        inventory.remove(&resource);
    } else {
        inventory.insert(resource, remaining);
    }

    Ok(())
}

/// Resources still needed to meet `requirements`.
///
/// `missing[k] = max(0, requirements[k] - inventory[k])`; satisfied kinds are
/// omitted, so an empty map means every requirement is met.
pub fn missing_resources(
    inventory: &BTreeMap<ResourceKind, u32>,
    requirements: &BTreeMap<ResourceKind, u32>,
) -> BTreeMap<ResourceKind, u32> {
    requirements
        .iter()
        .filter_map(|(&resource, &needed)| {
            let short = needed.saturating_sub(quantity(inventory, resource));
            (short > 0).then_some((resource, short))
        })
        .collect()
}
