use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Allocate, Assign, CreateAccount, Transfer};
use crate::errors::ErrorCode;

/// True once the program has created and written the account
pub fn is_initialized(info: &AccountInfo) -> bool {
    info.owner == &crate::ID && !info.data_is_empty()
}

/// Create a program-owned PDA via system program CPI (extracted to reduce stack usage)
///
/// Mirrors what `#[account(init)]` does, including the case where someone
/// already sent lamports to the address: top up, allocate, assign.
#[inline(never)]
pub fn create_pda_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    space: usize,
    seeds: &[&[u8]],
) -> Result<()> {
    require!(!is_initialized(target), ErrorCode::InvalidAccountAddress);

    let required = Rent::get()?.minimum_balance(space);
    let current = target.lamports();

    if current == 0 {
        system_program::create_account(
            CpiContext::new_with_signer(
                system_program.clone(),
                CreateAccount { from: payer.clone(), to: target.clone() },
                &[seeds],
            ),
            required,
            space as u64,
            &crate::ID,
        )?;
        return Ok(());
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                system_program.clone(),
                Transfer { from: payer.clone(), to: target.clone() },
            ),
            top_up,
        )?;
    }
    system_program::allocate(
        CpiContext::new_with_signer(
            system_program.clone(),
            Allocate { account_to_allocate: target.clone() },
            &[seeds],
        ),
        space as u64,
    )?;
    system_program::assign(
        CpiContext::new_with_signer(
            system_program.clone(),
            Assign { account_to_assign: target.clone() },
            &[seeds],
        ),
        &crate::ID,
    )?;

    Ok(())
}

/// Serialize an account value (discriminator + data) into a freshly created account
pub fn write_account<T: AccountSerialize>(target: &AccountInfo, value: &T) -> Result<()> {
    let mut data = target.try_borrow_mut_data()?;
    let mut cursor: &mut [u8] = &mut data[..];
    value.try_serialize(&mut cursor)?;
    Ok(())
}

/// Deserialize a program-owned account passed without a typed wrapper
pub fn load_account<T: AccountDeserialize>(info: &AccountInfo) -> Result<T> {
    require!(info.owner == &crate::ID, ErrorCode::InvalidAccountOwner);
    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &data[..])
}

/// Close a program-owned account passed without a typed wrapper: move its
/// lamports to `destination`, hand it back to the system program, zero its data
pub fn close_account<'info>(info: &AccountInfo<'info>, destination: &AccountInfo<'info>) -> Result<()> {
    require!(info.owner == &crate::ID, ErrorCode::InvalidAccountOwner);

    let released = info.lamports();
    let credited = destination
        .lamports()
        .checked_add(released)
        .ok_or(ErrorCode::MathOverflow)?;
    **destination.try_borrow_mut_lamports()? = credited;
    **info.try_borrow_mut_lamports()? = 0;

    info.assign(&System::id());
    info.realloc(0, false)?;
    Ok(())
}
