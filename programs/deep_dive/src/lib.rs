use anchor_lang::prelude::*;
use anchor_lang::solana_program::program::invoke;
use anchor_lang::solana_program::system_instruction;
use anchor_lang::solana_program::sysvar::slot_hashes;
use anchor_lang::AccountsClose;

declare_id!("J4RzevMXGpqRUao3LXBCdEtg8fKr4v1dHR2G5DpnPKqs");

#[cfg(not(feature = "no-entrypoint"))]
use solana_security_txt::security_txt;

#[cfg(not(feature = "no-entrypoint"))]
security_txt! {
    name: "Deep Dive",
    project_url: "https://www.deepdive.bet",
    contacts: "email:security@deepdive.bet",
    policy: "https://www.deepdive.bet/terms",
    preferred_languages: "en",
    source_code: "https://github.com/deepdive-bet/deep-dive",
    auditors: "Unaudited. Provably fair via SlotHashes-seeded deterministic rounds"
}

// ── Constants ─────────────────────────────────────────────────────────────
pub const PPM: u64 = 1_000_000;  // probability unit: parts per million
pub const ROLL_RANGE: u64 = 100; // per-round roll ∈ [0, 100)

// ── Default Game Parameters ──────────────────────────────────────────────
// Applied when initialize_config is called with unset fields.
// Survival starts at 70.0% and decays 0.8% per round down to a 5.0% floor;
// treasure grows 1.9x per survived round, payouts capped at 100x the bet.
pub const DEFAULT_BASE_SURVIVAL_PPM:   u32 = 700_000;
pub const DEFAULT_DECAY_PER_ROUND_PPM: u32 = 8_000;
pub const DEFAULT_MIN_SURVIVAL_PPM:    u32 = 50_000;
pub const DEFAULT_MULTIPLIER_NUM:      u16 = 19;
pub const DEFAULT_MULTIPLIER_DEN:      u16 = 10;
pub const DEFAULT_MAX_PAYOUT_MULT:     u16 = 100;
pub const DEFAULT_MAX_ROUNDS:          u16 = 5;
pub const DEFAULT_MIN_BET:             u64 = 10_000_000;  // 0.01 SOL
pub const DEFAULT_MAX_BET:             u64 = 500_000_000; // 0.5 SOL

pub type GameResult<T> = core::result::Result<T, DiveError>;

#[program]
pub mod deep_dive {
    use super::*;

    // ── Initialize Config (singleton) ─────────────────────────────
    pub fn initialize_config(ctx: Context<InitializeConfig>, params: GameConfigParams) -> Result<()> {
        let mut config = params.resolve()?;
        config.admin = ctx.accounts.admin.key();
        config.bump = ctx.bumps.config;

        emit!(ConfigInitialized {
            admin: config.admin,
            max_rounds: config.max_rounds,
            max_payout_multiplier: config.max_payout_multiplier,
        });
        ctx.accounts.config.set_inner(config);
        Ok(())
    }

    // ── Initialize House Vault (one per authority) ────────────────
    pub fn initialize_house_vault(ctx: Context<InitializeHouseVault>) -> Result<()> {
        let vault = &mut ctx.accounts.house_vault;
        vault.house_authority = ctx.accounts.house_authority.key();
        vault.locked          = false;
        vault.total_reserved  = 0;
        vault.bump            = ctx.bumps.house_vault;

        emit!(HouseVaultInitialized {
            house_vault: vault.key(),
            house_authority: vault.house_authority,
        });
        Ok(())
    }

    // ── Toggle the vault lock (stops new liability, not live games) ──
    pub fn toggle_house_lock(ctx: Context<ToggleHouseLock>) -> Result<()> {
        let vault_key = ctx.accounts.house_vault.key();
        let vault = &mut ctx.accounts.house_vault;
        vault.locked = !vault.locked;

        emit!(HouseLockToggled { house_vault: vault_key, locked: vault.locked });
        Ok(())
    }

    // ── Fund the vault (authority or anyone can add liquidity) ────
    pub fn fund_vault(ctx: Context<FundVault>, amount: u64) -> Result<()> {
        let ix = system_instruction::transfer(
            &ctx.accounts.funder.key(),
            &ctx.accounts.house_vault.key(),
            amount,
        );
        invoke(&ix, &[
            ctx.accounts.funder.to_account_info(),
            ctx.accounts.house_vault.to_account_info(),
        ])?;

        emit!(VaultFunded {
            house_vault: ctx.accounts.house_vault.key(),
            funder: ctx.accounts.funder.key(),
            amount,
        });
        Ok(())
    }

    // ── Withdraw free liquidity (never touches reserved funds) ────
    pub fn withdraw_house(ctx: Context<WithdrawHouse>, amount: u64) -> Result<()> {
        let free = vault_free_liquidity(&ctx.accounts.house_vault)?;
        require!(amount <= free, DiveError::InsufficientVaultBalance);

        **ctx.accounts.house_vault.to_account_info().try_borrow_mut_lamports()? -= amount;
        **ctx.accounts.house_authority.to_account_info().try_borrow_mut_lamports()? += amount;

        emit!(HouseWithdrawn { house_vault: ctx.accounts.house_vault.key(), amount });
        Ok(())
    }

    // ── Start Session ─────────────────────────────────────────────
    // The vault reserves the session's worst-case payout up front, so the
    // sum of max payouts over all open sessions can never exceed what the
    // vault physically holds.
    pub fn start_session(
        ctx: Context<StartSession>,
        bet_lamports: u64,
        session_index: u64,
    ) -> Result<()> {
        let clock = Clock::get()?;
        let player_key = ctx.accounts.player.key();
        let vault_key = ctx.accounts.house_vault.key();
        let config = &ctx.accounts.config;

        require!(!ctx.accounts.house_vault.locked, DiveError::HouseLocked);
        check_bet_bounds(config, bet_lamports)?;
        let max_payout = max_payout_for_bet(config, bet_lamports)?;

        // Admit the liability against liquidity already in the vault;
        // the incoming stake must not count toward its own coverage.
        let free = vault_free_liquidity(&ctx.accounts.house_vault)?;
        ctx.accounts.house_vault.reserve(max_payout, free)?;

        // ── Transfer stake player → vault ────────────────────────
        let ix = system_instruction::transfer(&player_key, &vault_key, bet_lamports);
        invoke(&ix, &[
            ctx.accounts.player.to_account_info(),
            ctx.accounts.house_vault.to_account_info(),
        ])?;

        // Seed from the newest not-yet-spent slot hash, bound to the
        // player and session index so concurrent opens cannot collide.
        let slot_hash = extract_recent_slot_hash(&ctx.accounts.slot_hashes.to_account_info())?;
        let rng_seed = derive_session_seed(&slot_hash, &player_key, session_index, clock.slot);

        let session                  = &mut ctx.accounts.session;
        session.player               = player_key;
        session.house_vault          = vault_key;
        session.status               = SessionStatus::Active;
        session.bet_lamports         = bet_lamports;
        session.current_treasure     = bet_lamports;
        session.max_payout           = max_payout;
        session.round_number         = 1;
        session.rng_seed             = rng_seed;
        session.bump                 = ctx.bumps.session;

        emit!(SessionStarted {
            session: session.key(),
            player: player_key,
            house_vault: vault_key,
            bet_lamports,
            max_payout,
            timestamp: clock.unix_timestamp,
        });
        Ok(())
    }

    // ── Play Round ────────────────────────────────────────────────
    // Deterministic: the outcome is fixed by the stored seed and the round
    // number the moment the session is opened. Replaying or delaying the
    // call cannot change it. Works on locked vaults: locking stops new
    // sessions and cash-outs, not games already underway.
    pub fn play_round(ctx: Context<PlayRound>, expected_round: Option<u16>) -> Result<()> {
        let clock = Clock::get()?;
        let player_key = ctx.accounts.player.key();
        let session_key = ctx.accounts.session.key();
        let resolved_round = ctx.accounts.session.round_number;

        let (survived, roll, threshold) = settle_round(
            &ctx.accounts.config,
            &mut ctx.accounts.house_vault,
            &mut ctx.accounts.session,
            &player_key,
            expected_round,
        )?;

        emit!(RoundResolved {
            session: session_key,
            player: player_key,
            round_number: resolved_round,
            roll: roll as u8,
            threshold: threshold as u8,
            survived,
            current_treasure: ctx.accounts.session.current_treasure,
            timestamp: clock.unix_timestamp,
        });

        if !survived {
            emit!(SessionLost {
                session: session_key,
                player: player_key,
                house_vault: ctx.accounts.session.house_vault,
                bet_lamports: ctx.accounts.session.bet_lamports,
                final_round: resolved_round,
                timestamp: clock.unix_timestamp,
            });
            // The stake stays in the vault; only the record rent returns.
            ctx.accounts.session.close(ctx.accounts.player.to_account_info())?;
        }
        Ok(())
    }

    // ── Cash Out ──────────────────────────────────────────────────
    pub fn cash_out(ctx: Context<CashOut>) -> Result<()> {
        let clock = Clock::get()?;
        let player_key = ctx.accounts.player.key();
        let session_key = ctx.accounts.session.key();

        // The vault must physically cover the payout before any mutation.
        let vault_ai = ctx.accounts.house_vault.to_account_info();
        let rent = Rent::get()?.minimum_balance(vault_ai.data_len());
        require!(
            vault_ai.lamports().saturating_sub(rent) >= ctx.accounts.session.current_treasure,
            DiveError::InsufficientVaultBalance
        );

        let payout = settle_cash_out(
            &mut ctx.accounts.house_vault,
            &mut ctx.accounts.session,
            &player_key,
        )?;

        **vault_ai.try_borrow_mut_lamports()? -= payout;
        **ctx.accounts.player.to_account_info().try_borrow_mut_lamports()? += payout;

        emit!(SessionCashedOut {
            session: session_key,
            player: player_key,
            house_vault: ctx.accounts.session.house_vault,
            payout,
            final_round: ctx.accounts.session.round_number,
            timestamp: clock.unix_timestamp,
        });
        Ok(())
    }

    // ── Lose Session (voluntary forfeit / abandoned-session cleanup) ──
    pub fn lose_session(ctx: Context<LoseSession>) -> Result<()> {
        let clock = Clock::get()?;
        let player_key = ctx.accounts.player.key();
        let session_key = ctx.accounts.session.key();
        let final_round = ctx.accounts.session.round_number;

        settle_loss(
            &mut ctx.accounts.house_vault,
            &mut ctx.accounts.session,
            &player_key,
        )?;

        emit!(SessionLost {
            session: session_key,
            player: player_key,
            house_vault: ctx.accounts.session.house_vault,
            bet_lamports: ctx.accounts.session.bet_lamports,
            final_round,
            timestamp: clock.unix_timestamp,
        });
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════
//  ROUND RESOLUTION ENGINE
// ══════════════════════════════════════════════════════════════════════════
// Pure functions of (config, round_number, seed). The stored seed never
// changes; only the derivation input varies with the round number.

/// Survival threshold for a round, as an integer percentage in [0, 100].
/// The ppm curve decays linearly with round number and clamps at the
/// configured floor. It never goes negative and never re-increases.
pub fn survival_threshold(config: &GameConfig, round_number: u16) -> u64 {
    let decay = (config.decay_per_round_ppm as u64)
        .saturating_mul(round_number.saturating_sub(1) as u64);
    let ppm = (config.base_survival_ppm as u64)
        .saturating_sub(decay)
        .max(config.min_survival_ppm as u64);
    // ppm / 1e6 scaled to a percentage, floored
    ppm / (PPM / ROLL_RANGE)
}

/// Per-round roll in [0, 100): blake3(seed || round_number), first 8 bytes.
/// A keyed hash rather than an advancing generator, so determinism
/// survives replay.
pub fn round_roll(rng_seed: &[u8; 32], round_number: u16) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(rng_seed);
    hasher.update(&round_number.to_le_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes(digest.as_bytes()[0..8].try_into().unwrap()) % ROLL_RANGE
}

/// Resolve one round. Returns (survived, roll, threshold).
pub fn resolve_round(config: &GameConfig, rng_seed: &[u8; 32], round_number: u16) -> (bool, u64, u64) {
    let threshold = survival_threshold(config, round_number);
    let roll = round_roll(rng_seed, round_number);
    (roll < threshold, roll, threshold)
}

/// Treasure after a survived round: current × num / den, capped at the
/// session's max payout. The multiplier is fixed per round.
pub fn grown_treasure(config: &GameConfig, current: u64, max_payout: u64) -> GameResult<u64> {
    let grown = current
        .checked_mul(config.multiplier_numerator as u64)
        .ok_or(DiveError::Overflow)?
        .checked_div(config.multiplier_denominator as u64)
        .ok_or(DiveError::Overflow)?;
    Ok(grown.min(max_payout))
}

// ══════════════════════════════════════════════════════════════════════════
//  SETTLEMENT CORE
// ══════════════════════════════════════════════════════════════════════════
// All record mutation funnels through these account-free functions; the
// instruction handlers above only add lamport transfers, events, and
// record close-out. Any Err leaves both records untouched because the
// surrounding transaction aborts.

/// Resolve the session's current round and apply the outcome.
/// Returns (survived, roll, threshold) for the caller to report.
pub fn settle_round(
    config: &GameConfig,
    house_vault: &mut HouseVault,
    session: &mut GameSession,
    player: &Pubkey,
    expected_round: Option<u16>,
) -> GameResult<(bool, u64, u64)> {
    if session.player != *player {
        return Err(DiveError::Unauthorized);
    }
    if session.status != SessionStatus::Active {
        return Err(DiveError::InvalidSessionStatus);
    }
    // Callers pass the round they expect this resolution to reach; a
    // stale or duplicated call shows up as a mismatch instead of
    // silently resolving a different round.
    if let Some(expected) = expected_round {
        let next = session.round_number.checked_add(1).ok_or(DiveError::Overflow)?;
        if expected != next {
            return Err(DiveError::RoundMismatch);
        }
    }
    if session.round_number > config.max_rounds {
        return Err(DiveError::MaxRoundsReached);
    }

    let (survived, roll, threshold) = resolve_round(config, &session.rng_seed, session.round_number);
    if survived {
        session.apply_survival(config)?;
    } else {
        house_vault.release(session.max_payout)?;
        session.apply_loss();
    }
    Ok((survived, roll, threshold))
}

/// Terminate with profit: pays out current treasure, releases the
/// reservation. Parity or worse is rejected; the player plays on or
/// forfeits explicitly.
pub fn settle_cash_out(
    house_vault: &mut HouseVault,
    session: &mut GameSession,
    player: &Pubkey,
) -> GameResult<u64> {
    if session.player != *player {
        return Err(DiveError::Unauthorized);
    }
    if session.status != SessionStatus::Active {
        return Err(DiveError::InvalidSessionStatus);
    }
    if house_vault.locked {
        return Err(DiveError::HouseLocked);
    }
    if session.current_treasure <= session.bet_lamports {
        return Err(DiveError::InsufficientTreasure);
    }

    house_vault.release(session.max_payout)?;
    session.status = SessionStatus::CashedOut;
    Ok(session.current_treasure)
}

/// Terminate without payout. Allowed on locked vaults, which stop new
/// liability and payouts but never exits.
pub fn settle_loss(
    house_vault: &mut HouseVault,
    session: &mut GameSession,
    player: &Pubkey,
) -> GameResult<()> {
    if session.player != *player {
        return Err(DiveError::Unauthorized);
    }
    if session.status != SessionStatus::Active {
        return Err(DiveError::InvalidSessionStatus);
    }

    house_vault.release(session.max_payout)?;
    session.apply_loss();
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════
//  HELPERS
// ══════════════════════════════════════════════════════════════════════════

fn check_bet_bounds(config: &GameConfig, bet_lamports: u64) -> GameResult<()> {
    if bet_lamports < config.min_bet {
        return Err(DiveError::InvalidBetAmount);
    }
    // max_bet == 0 means unbounded
    if config.max_bet > 0 && bet_lamports > config.max_bet {
        return Err(DiveError::InvalidBetAmount);
    }
    Ok(())
}

fn max_payout_for_bet(config: &GameConfig, bet_lamports: u64) -> GameResult<u64> {
    bet_lamports
        .checked_mul(config.max_payout_multiplier as u64)
        .ok_or(DiveError::Overflow)
}

/// Lamports the vault could lose without touching rent or reserved
/// liability. Reservations are admitted against this number.
fn vault_free_liquidity(vault: &Account<HouseVault>) -> Result<u64> {
    let vault_ai = vault.to_account_info();
    let rent = Rent::get()?.minimum_balance(vault_ai.data_len());
    Ok(vault_ai
        .lamports()
        .saturating_sub(rent)
        .saturating_sub(vault.total_reserved))
}

/// Newest entry of the SlotHashes sysvar, parsed from the raw account
/// data: an 8-byte count followed by (slot: u64, hash: [u8; 32]) pairs,
/// newest first.
fn extract_recent_slot_hash(slot_hashes_ai: &AccountInfo) -> Result<[u8; 32]> {
    let data = slot_hashes_ai.data.borrow();
    let n = u64::from_le_bytes(data[0..8].try_into().unwrap());
    require!(n > 0, DiveError::SlotHashNotFound);
    Ok(data[16..48].try_into().unwrap())
}

/// Session seed: blake3( slot_hash || player || session_index || slot ).
/// The slot hash is not known before the opening transaction is admitted;
/// player and index separate concurrent opens in the same slot.
pub fn derive_session_seed(
    slot_hash: &[u8; 32],
    player: &Pubkey,
    session_index: u64,
    slot: u64,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(slot_hash);
    hasher.update(player.as_ref());
    hasher.update(&session_index.to_le_bytes());
    hasher.update(&slot.to_le_bytes());
    *hasher.finalize().as_bytes()
}

// ══════════════════════════════════════════════════════════════════════════
//  ACCOUNTS
// ══════════════════════════════════════════════════════════════════════════

#[derive(Accounts)]
pub struct InitializeConfig<'info> {
    #[account(init, payer = admin, space = 8 + GameConfig::LEN,
              seeds = [b"game_config"], bump)]
    pub config: Account<'info, GameConfig>,
    #[account(mut)] pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeHouseVault<'info> {
    #[account(init, payer = house_authority, space = 8 + HouseVault::LEN,
              seeds = [b"house_vault", house_authority.key().as_ref()], bump)]
    pub house_vault: Account<'info, HouseVault>,
    #[account(mut)] pub house_authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ToggleHouseLock<'info> {
    #[account(mut, seeds = [b"house_vault", house_authority.key().as_ref()], bump = house_vault.bump,
              has_one = house_authority @ DiveError::Unauthorized)]
    pub house_vault: Account<'info, HouseVault>,
    pub house_authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct FundVault<'info> {
    #[account(mut, seeds = [b"house_vault", house_vault.house_authority.as_ref()], bump = house_vault.bump)]
    pub house_vault: Account<'info, HouseVault>,
    #[account(mut)] pub funder: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct WithdrawHouse<'info> {
    #[account(mut, seeds = [b"house_vault", house_authority.key().as_ref()], bump = house_vault.bump,
              has_one = house_authority @ DiveError::Unauthorized)]
    pub house_vault: Account<'info, HouseVault>,
    #[account(mut)] pub house_authority: Signer<'info>,
}

#[derive(Accounts)]
#[instruction(bet_lamports: u64, session_index: u64)]
pub struct StartSession<'info> {
    #[account(mut)] pub player: Signer<'info>,
    #[account(seeds = [b"game_config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,
    #[account(mut, seeds = [b"house_vault", house_vault.house_authority.as_ref()], bump = house_vault.bump)]
    pub house_vault: Account<'info, HouseVault>,
    // Reusing a live session_index fails here: init aborts on an
    // existing account.
    #[account(init, payer = player, space = 8 + GameSession::LEN,
              seeds = [b"session", player.key().as_ref(), session_index.to_le_bytes().as_ref()], bump)]
    pub session: Account<'info, GameSession>,
    /// CHECK: address constraint pins this to the SlotHashes sysvar
    #[account(address = slot_hashes::ID)]
    pub slot_hashes: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct PlayRound<'info> {
    #[account(mut)] pub player: Signer<'info>,
    #[account(seeds = [b"game_config"], bump = config.bump)]
    pub config: Account<'info, GameConfig>,
    #[account(mut)]
    pub house_vault: Account<'info, HouseVault>,
    #[account(mut, has_one = player @ DiveError::Unauthorized, has_one = house_vault)]
    pub session: Account<'info, GameSession>,
}

#[derive(Accounts)]
pub struct CashOut<'info> {
    #[account(mut)] pub player: Signer<'info>,
    #[account(mut)]
    pub house_vault: Account<'info, HouseVault>,
    #[account(mut, has_one = player @ DiveError::Unauthorized, has_one = house_vault,
              close = player)]
    pub session: Account<'info, GameSession>,
}

#[derive(Accounts)]
pub struct LoseSession<'info> {
    #[account(mut)] pub player: Signer<'info>,
    #[account(mut)]
    pub house_vault: Account<'info, HouseVault>,
    #[account(mut, has_one = player @ DiveError::Unauthorized, has_one = house_vault,
              close = player)]
    pub session: Account<'info, GameSession>,
}

// ══════════════════════════════════════════════════════════════════════════
//  STATE
// ══════════════════════════════════════════════════════════════════════════

/// Singleton game parameters. Written once through the validation in
/// GameConfigParams::resolve; there is no field-wise update path.
#[account]
pub struct GameConfig {
    pub admin:                  Pubkey, // 32
    pub base_survival_ppm:      u32,    // 4
    pub decay_per_round_ppm:    u32,    // 4
    pub min_survival_ppm:       u32,    // 4
    pub multiplier_numerator:   u16,    // 2
    pub multiplier_denominator: u16,    // 2
    pub max_payout_multiplier:  u16,    // 2
    pub max_rounds:             u16,    // 2
    pub min_bet:                u64,    // 8
    pub max_bet:                u64,    // 8 (0 means unbounded)
    pub bump:                   u8,     // 1
}
impl GameConfig { pub const LEN: usize = 32 + 4 + 4 + 4 + 2 + 2 + 2 + 2 + 8 + 8 + 1; }

#[account]
pub struct HouseVault {
    pub house_authority: Pubkey, // 32
    pub locked:          bool,   // 1
    pub total_reserved:  u64,    // 8
    pub bump:            u8,     // 1
}
impl HouseVault { pub const LEN: usize = 32 + 1 + 8 + 1; }

impl HouseVault {
    /// Admit new liability. `free_liquidity` is the vault's spendable
    /// balance net of rent and existing reservations.
    pub fn reserve(&mut self, amount: u64, free_liquidity: u64) -> GameResult<()> {
        if free_liquidity < amount {
            return Err(DiveError::InsufficientVaultBalance);
        }
        self.total_reserved = self
            .total_reserved
            .checked_add(amount)
            .ok_or(DiveError::Overflow)?;
        Ok(())
    }

    /// Release exactly what a paired reserve added. Underflow here means
    /// the accounting was already broken upstream, not bad user input.
    pub fn release(&mut self, amount: u64) -> GameResult<()> {
        self.total_reserved = self
            .total_reserved
            .checked_sub(amount)
            .ok_or(DiveError::AccountingBroken)?;
        Ok(())
    }
}

#[account]
pub struct GameSession {
    pub player:           Pubkey,        // 32
    pub house_vault:      Pubkey,        // 32
    pub status:           SessionStatus, // 1
    pub bet_lamports:     u64,           // 8
    pub current_treasure: u64,           // 8
    pub max_payout:       u64,           // 8
    pub round_number:     u16,           // 2
    pub rng_seed:         [u8; 32],      // 32
    pub bump:             u8,            // 1
}
impl GameSession { pub const LEN: usize = 32 + 32 + 1 + 8 + 8 + 8 + 2 + 32 + 1; }

impl GameSession {
    /// Apply a survived round: grow the treasure and advance the round
    /// counter. The monotonicity and cap checks should be unreachable
    /// given a correct engine, but a violated invariant must abort
    /// rather than corrupt the ledger.
    pub fn apply_survival(&mut self, config: &GameConfig) -> GameResult<()> {
        let new_treasure = grown_treasure(config, self.current_treasure, self.max_payout)?;
        if new_treasure < self.current_treasure || new_treasure > self.max_payout {
            return Err(DiveError::TreasureInvalid);
        }
        self.current_treasure = new_treasure;
        self.round_number = self
            .round_number
            .checked_add(1)
            .ok_or(DiveError::Overflow)?;
        Ok(())
    }

    pub fn apply_loss(&mut self) {
        self.current_treasure = 0;
        self.status = SessionStatus::Lost;
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionStatus {
    Active,
    Lost,
    CashedOut,
}

/// initialize_config arguments. Unset fields fall back to the DEFAULT_*
/// constants above.
#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct GameConfigParams {
    pub base_survival_ppm:      Option<u32>,
    pub decay_per_round_ppm:    Option<u32>,
    pub min_survival_ppm:       Option<u32>,
    pub multiplier_numerator:   Option<u16>,
    pub multiplier_denominator: Option<u16>,
    pub max_payout_multiplier:  Option<u16>,
    pub max_rounds:             Option<u16>,
    pub min_bet:                Option<u64>,
    pub max_bet:                Option<u64>,
}

impl GameConfigParams {
    /// Fill defaults and validate everything atomically; nothing is
    /// written unless the whole parameter set is coherent.
    pub fn resolve(&self) -> GameResult<GameConfig> {
        let config = GameConfig {
            admin: Pubkey::default(),
            base_survival_ppm: self.base_survival_ppm.unwrap_or(DEFAULT_BASE_SURVIVAL_PPM),
            decay_per_round_ppm: self.decay_per_round_ppm.unwrap_or(DEFAULT_DECAY_PER_ROUND_PPM),
            min_survival_ppm: self.min_survival_ppm.unwrap_or(DEFAULT_MIN_SURVIVAL_PPM),
            multiplier_numerator: self.multiplier_numerator.unwrap_or(DEFAULT_MULTIPLIER_NUM),
            multiplier_denominator: self.multiplier_denominator.unwrap_or(DEFAULT_MULTIPLIER_DEN),
            max_payout_multiplier: self.max_payout_multiplier.unwrap_or(DEFAULT_MAX_PAYOUT_MULT),
            max_rounds: self.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS),
            min_bet: self.min_bet.unwrap_or(DEFAULT_MIN_BET),
            max_bet: self.max_bet.unwrap_or(DEFAULT_MAX_BET),
            bump: 0,
        };
        config.validate()?;
        Ok(config)
    }
}

impl GameConfig {
    pub fn validate(&self) -> GameResult<()> {
        if self.base_survival_ppm as u64 > PPM
            || self.min_survival_ppm as u64 > PPM
            || self.max_rounds == 0
            || self.max_payout_multiplier == 0
            || self.multiplier_denominator == 0
        {
            return Err(DiveError::InvalidConfig);
        }
        if self.max_bet > 0 && self.min_bet > self.max_bet {
            return Err(DiveError::InvalidConfig);
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════
//  ERRORS & EVENTS
// ══════════════════════════════════════════════════════════════════════════

#[error_code]
pub enum DiveError {
    #[msg("Invalid game configuration")]
    InvalidConfig,
    #[msg("Caller is not the required authority")]
    Unauthorized,
    #[msg("Record already exists")]
    AlreadyExists,
    #[msg("Record not found")]
    NotFound,
    #[msg("Session is not active")]
    InvalidSessionStatus,
    #[msg("Bet outside configured bounds")]
    InvalidBetAmount,
    #[msg("House vault is locked")]
    HouseLocked,
    #[msg("Round number does not match the session")]
    RoundMismatch,
    #[msg("Session reached the round ceiling")]
    MaxRoundsReached,
    #[msg("Treasure value out of bounds")]
    TreasureInvalid,
    #[msg("Vault cannot cover the liability")]
    InsufficientVaultBalance,
    #[msg("No profit to cash out")]
    InsufficientTreasure,
    #[msg("Arithmetic overflow")]
    Overflow,
    #[msg("Slot hashes sysvar is empty")]
    SlotHashNotFound,
    #[msg("Reservation accounting broken")]
    AccountingBroken,
}

#[event] pub struct ConfigInitialized    { pub admin: Pubkey, pub max_rounds: u16, pub max_payout_multiplier: u16 }
#[event] pub struct HouseVaultInitialized { pub house_vault: Pubkey, pub house_authority: Pubkey }
#[event] pub struct HouseLockToggled     { pub house_vault: Pubkey, pub locked: bool }
#[event] pub struct VaultFunded          { pub house_vault: Pubkey, pub funder: Pubkey, pub amount: u64 }
#[event] pub struct HouseWithdrawn       { pub house_vault: Pubkey, pub amount: u64 }
#[event] pub struct SessionStarted       { pub session: Pubkey, pub player: Pubkey, pub house_vault: Pubkey, pub bet_lamports: u64, pub max_payout: u64, pub timestamp: i64 }
#[event] pub struct RoundResolved        { pub session: Pubkey, pub player: Pubkey, pub round_number: u16, pub roll: u8, pub threshold: u8, pub survived: bool, pub current_treasure: u64, pub timestamp: i64 }
#[event] pub struct SessionLost          { pub session: Pubkey, pub player: Pubkey, pub house_vault: Pubkey, pub bet_lamports: u64, pub final_round: u16, pub timestamp: i64 }
#[event] pub struct SessionCashedOut     { pub session: Pubkey, pub player: Pubkey, pub house_vault: Pubkey, pub payout: u64, pub final_round: u16, pub timestamp: i64 }

// ══════════════════════════════════════════════════════════════════════════
//  TESTS
// ══════════════════════════════════════════════════════════════════════════
