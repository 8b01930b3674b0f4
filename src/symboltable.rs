use bimap::BiMap;
use string_cache::DefaultAtom;

/**
  A symbol table maps assembly labels to the address of the byte they label. A symbol table is
  really just a convenience wrapper around a BiMap: the assembler resolves labels to addresses,
  and listings go the other way to print a label beside its instruction.

  As with all strings in this codebase, label names are interned.
*/
#[derive(Clone, Debug)]
pub struct SymbolTable {
  table: BiMap<DefaultAtom, usize>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable {
      table: BiMap::new()
    }
  }

  pub fn get_symbol(&self, address: usize) -> Option<&str> {
    self.table.get_by_right(&address).map(|atom| &**atom)
  }

  pub fn get_address(&self, name: &str) -> Option<usize> {
    self.table.get_by_left(&DefaultAtom::from(name)).copied()
  }

  /// Fails, returning the rejected pair, if either the name or the address is already present.
  pub fn insert(&mut self, name: &str, address: usize) -> Result<(), (DefaultAtom, usize)> {
    self.table.insert_no_overwrite(DefaultAtom::from(name), address)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}
